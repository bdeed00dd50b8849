//! Disjoint path queries
//!
//! A [QueryManager] runs one lookup as a set of concurrent paths, sharing the
//! set of peers already visited so that no two paths ever query the same peer,
//! and merges their events into a single [QueryStream].

mod events;
mod path;

use std::{
    collections::HashSet,
    fmt::{self, Debug, Formatter},
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::{
    ready,
    stream::{BoxStream, Stream},
    StreamExt,
};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::{
    common::{Id, PeerId},
    config::{QueryManagerConfig, RunOptions},
    signal::{Signal, TimeoutSignal},
    Error, Result,
};

pub use events::*;

use path::{admit, query_path, PathContext};

/// Queries a single peer, yielding the events of that exchange.
pub type QueryFn =
    Arc<dyn Fn(QueryContext) -> BoxStream<'static, Result<QueryEvent>> + Send + Sync>;

#[derive(Debug, Clone)]
/// Arguments of a single [QueryFn] call.
pub struct QueryContext {
    /// The key being looked up.
    pub key: Bytes,
    /// The peer to query.
    pub peer: PeerId,
    /// Fired when this call should stop, because the run was aborted or
    /// the call timed out.
    pub signal: Signal,
    pub path_index: usize,
    pub num_paths: usize,
}

struct Inner {
    local_peer: PeerId,
    config: QueryManagerConfig,
    /// Parent of every run's internal signal, `None` when stopped.
    shutdown: Mutex<Option<Signal>>,
    running: Arc<AtomicUsize>,
}

#[derive(Clone)]
/// Runs queries over disjoint paths.
pub struct QueryManager {
    inner: Arc<Inner>,
}

impl QueryManager {
    pub fn new(local_peer: PeerId, config: QueryManagerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                local_peer,
                config,
                shutdown: Mutex::new(None),
                running: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    // === Getters ===

    pub fn config(&self) -> &QueryManagerConfig {
        &self.inner.config
    }

    pub fn is_started(&self) -> bool {
        self.inner.shutdown.lock().expect("mutex").is_some()
    }

    /// Number of runs whose [QueryStream] is still alive.
    pub fn running_queries(&self) -> usize {
        self.inner.running.load(Ordering::SeqCst)
    }

    // === Public Methods ===

    pub fn start(&self) {
        let mut shutdown = self.inner.shutdown.lock().expect("mutex");

        if shutdown.is_none() {
            *shutdown = Some(Signal::new());
        }
    }

    /// Abort every outstanding run, their streams end without an error.
    pub fn stop(&self) {
        if let Some(shutdown) = self.inner.shutdown.lock().expect("mutex").take() {
            debug!(running = self.running_queries(), "Stopping query manager");
            shutdown.abort();
        }
    }

    /// Look up `key`, starting one path from each of the first `disjoint_paths`
    /// seed peers.
    ///
    /// `seed_peers` are expected to be sorted by distance to the key. The local
    /// peer and duplicates are skipped.
    pub fn run(
        &self,
        key: impl Into<Bytes>,
        seed_peers: Vec<PeerId>,
        query_fn: QueryFn,
        options: RunOptions,
    ) -> Result<QueryStream> {
        let internal = self
            .inner
            .shutdown
            .lock()
            .expect("mutex")
            .as_ref()
            .ok_or(Error::NotStarted("QueryManager"))?
            .child();

        let config = &self.inner.config;
        let key: Bytes = key.into();
        let target = Id::from_key(&key);

        let (timeout, caller) = match options.signal {
            Some(signal) => (None, signal),
            None => {
                let timeout = TimeoutSignal::new(config.query_timeout);
                let signal = timeout.signal().clone();

                (Some(timeout), signal)
            }
        };
        let signal = Signal::any([&internal, &caller]);

        let seen = Arc::new(Mutex::new(HashSet::new()));
        let max_paths = config.disjoint_paths.max(1).min(seed_peers.len());

        let starts = seed_peers
            .into_iter()
            .filter(|peer| admit(&seen, &self.inner.local_peer, peer))
            .take(max_paths)
            .collect::<Vec<_>>();
        let num_paths = starts.len();

        debug!(?target, num_paths, "Running query");

        // Bounded, so paths wait on a consumer that stopped draining.
        let (sender, receiver) = flume::bounded(num_paths.max(1));

        let paths = starts
            .into_iter()
            .enumerate()
            .map(|(path_index, start)| {
                let context = PathContext {
                    key: key.clone(),
                    target,
                    local_peer: self.inner.local_peer.clone(),
                    path_index,
                    num_paths,
                    alpha: config.alpha,
                    query_func_timeout: options.query_func_timeout.or(config.query_func_timeout),
                    query_fn: query_fn.clone(),
                    seen: seen.clone(),
                    signal: signal.clone(),
                };

                tokio::spawn(query_path(context, start, sender.clone()))
            })
            .collect();

        self.inner.running.fetch_add(1, Ordering::SeqCst);

        Ok(QueryStream {
            events: receiver.into_stream().boxed(),
            internal,
            paths,
            _timeout: timeout,
            running: self.inner.running.clone(),
            target,
            finished: false,
        })
    }
}

impl Debug for QueryManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryManager")
            .field("started", &self.is_started())
            .field("running_queries", &self.running_queries())
            .finish()
    }
}

/// Merged events of every path of a run, in the order they arrive.
///
/// Ends when every path is exhausted. If the run is cancelled by its caller or
/// times out, the last item is `Err(Error::QueryAborted)`. Dropping the stream
/// aborts the run.
pub struct QueryStream {
    events: BoxStream<'static, Result<QueryEvent>>,
    /// Child of the manager's shutdown signal.
    internal: Signal,
    paths: Vec<JoinHandle<()>>,
    _timeout: Option<TimeoutSignal>,
    running: Arc<AtomicUsize>,
    target: Id,
    finished: bool,
}

impl QueryStream {
    /// Kad id of the key being looked up.
    pub fn target(&self) -> &Id {
        &self.target
    }

    /// Abort the run, the stream ends without an error.
    pub fn abort(&self) {
        self.internal.abort();
    }
}

impl Stream for QueryStream {
    type Item = Result<QueryEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.finished {
            return Poll::Ready(None);
        }

        match ready!(this.events.poll_next_unpin(cx)) {
            Some(Ok(event)) => Poll::Ready(Some(Ok(event))),
            Some(Err(error)) => {
                this.finished = true;

                // Aborted by the manager shutting down or by ourselves.
                let swallow = this.internal.is_aborted();
                this.internal.abort();

                if swallow {
                    trace!(target = ?this.target, "Query stopped");
                    Poll::Ready(None)
                } else {
                    debug!(target = ?this.target, ?error, "Query aborted");
                    Poll::Ready(Some(Err(error)))
                }
            }
            None => {
                this.finished = true;
                trace!(target = ?this.target, "Query finished");

                Poll::Ready(None)
            }
        }
    }
}

impl Drop for QueryStream {
    fn drop(&mut self) {
        self.internal.abort();

        for path in &self.paths {
            path.abort();
        }

        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Debug for QueryStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryStream")
            .field("target", &self.target)
            .field("paths", &self.paths.len())
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use futures::stream;

    use super::*;

    fn manager() -> QueryManager {
        let manager = QueryManager::new(PeerId::random(), QueryManagerConfig::default());
        manager.start();
        manager
    }

    fn empty_query_fn() -> QueryFn {
        Arc::new(|_| stream::empty().boxed())
    }

    #[tokio::test]
    async fn not_started() {
        let manager = QueryManager::new(PeerId::random(), QueryManagerConfig::default());

        assert!(matches!(
            manager.run(b"key".to_vec(), vec![], empty_query_fn(), Default::default()),
            Err(Error::NotStarted(_))
        ));

        manager.start();
        assert!(manager.is_started());
        manager.stop();

        assert!(matches!(
            manager.run(b"key".to_vec(), vec![], empty_query_fn(), Default::default()),
            Err(Error::NotStarted(_))
        ));
    }

    #[tokio::test]
    async fn empty_seeds() {
        let manager = manager();

        let mut stream = manager
            .run(b"key".to_vec(), vec![], empty_query_fn(), Default::default())
            .unwrap();

        assert_eq!(manager.running_queries(), 1);
        assert!(stream.next().await.is_none());

        drop(stream);
        assert_eq!(manager.running_queries(), 0);
    }

    #[tokio::test]
    async fn skips_local_and_duplicate_seeds() {
        let local = PeerId::random();
        let manager = QueryManager::new(local.clone(), QueryManagerConfig::default());
        manager.start();

        let other = PeerId::random();
        let queried = Arc::new(Mutex::new(vec![]));

        let query_fn: QueryFn = {
            let queried = queried.clone();
            Arc::new(move |context: QueryContext| {
                queried.lock().unwrap().push(context.peer);
                stream::empty().boxed()
            })
        };

        let stream = manager
            .run(
                b"key".to_vec(),
                vec![local, other.clone(), other.clone()],
                query_fn,
                Default::default(),
            )
            .unwrap();

        let events = stream.collect::<Vec<_>>().await;

        assert!(events.is_empty());
        assert_eq!(*queried.lock().unwrap(), vec![other]);
    }
}
