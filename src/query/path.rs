//! A single disjoint path of a query.
//!
//! Starting from one seed peer, repeatedly query the closest known peer that was
//! not queried yet by this or any other path of the same run, at most `alpha`
//! peers at a time, until there is nobody left to ask.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use bytes::Bytes;
use futures::{
    future,
    stream::{self, BoxStream, SelectAll},
    StreamExt,
};
use tracing::{debug, trace};

use crate::{
    common::{Id, PeerId},
    query::{query_error_event, QueryContext, QueryEvent, QueryFn},
    signal::{Signal, TimeoutSignal},
    Error, Result,
};

/// Peers already queried, or about to be, by any path of a run.
pub(crate) type PeerSet = Arc<Mutex<HashSet<PeerId>>>;

/// Everything a path needs, shared by all paths of a run except for the
/// start peer and index.
#[derive(Clone)]
pub(crate) struct PathContext {
    pub key: Bytes,
    pub target: Id,
    pub local_peer: PeerId,
    pub path_index: usize,
    pub num_paths: usize,
    pub alpha: usize,
    pub query_func_timeout: Option<Duration>,
    pub query_fn: QueryFn,
    pub seen: PeerSet,
    /// Aborts the whole path when fired.
    pub signal: Signal,
}

#[derive(Debug)]
struct QueueEntry {
    distance: Id,
    /// Insertion order, to break ties between equidistant peers.
    seq: u64,
    peer: PeerId,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance && self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    /// Reversed, so the closest and then oldest entry is at the top of the max-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .cmp(&self.distance)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Output of a single call of the query function.
enum CallItem {
    Event(QueryEvent),
    /// The call failed for reasons unrelated to the path's signal.
    Failed(PeerId, Error),
    /// The path's signal fired while the call was running.
    Aborted,
    /// The call finished, its slot is free again.
    Done,
}

struct CallState {
    events: BoxStream<'static, Result<QueryEvent>>,
    peer: PeerId,
    /// Path signal or the per call timeout.
    signal: Signal,
    path_signal: Signal,
    timeout: Option<(TimeoutSignal, Duration)>,
    finished: bool,
}

/// Mark a peer as seen, returns `false` if it is the local peer or was already
/// seen by any path of the run.
pub(crate) fn admit(seen: &PeerSet, local_peer: &PeerId, peer: &PeerId) -> bool {
    if peer == local_peer {
        return false;
    }

    seen.lock().expect("mutex").insert(peer.clone())
}

/// Run a path to completion, sending every event to `sender`.
///
/// Ends with an `Err(Error::QueryAborted)` if the path's signal fires first.
pub(crate) async fn query_path(
    context: PathContext,
    start: PeerId,
    sender: flume::Sender<Result<QueryEvent>>,
) {
    let path_index = context.path_index;
    let alpha = context.alpha.max(1);

    let mut queue = BinaryHeap::new();
    let mut seq = 0;
    let mut inflight: SelectAll<BoxStream<'static, CallItem>> = SelectAll::new();

    // Seeds were already admitted when the run was split into paths.
    queue.push(context.entry(start, &mut seq));

    loop {
        while inflight.len() < alpha {
            match queue.pop() {
                Some(entry) => {
                    trace!(path_index, peer = ?entry.peer, "Querying peer");
                    inflight.push(context.call(entry.peer));
                }
                None => break,
            }
        }

        if inflight.is_empty() {
            break;
        }

        let item = tokio::select! {
            biased;
            _ = context.signal.aborted() => CallItem::Aborted,
            item = inflight.next() => match item {
                Some(item) => item,
                None => continue,
            },
        };

        let event = match item {
            CallItem::Event(event) => {
                for closer in event.closer_peers() {
                    context.trace_distance(&closer.id, event.from());

                    if context.admit(&closer.id) {
                        queue.push(context.entry(closer.id.clone(), &mut seq));
                    }
                }

                Ok(event)
            }
            CallItem::Failed(peer, error) => {
                debug!(path_index, ?peer, ?error, "Query to peer failed");

                Ok(query_error_event(peer, error))
            }
            CallItem::Aborted => {
                trace!(path_index, "Path aborted");

                let _ = sender.send_async(Err(Error::QueryAborted)).await;
                return;
            }
            CallItem::Done => continue,
        };

        if sender.send_async(event).await.is_err() {
            // Nobody is listening anymore.
            return;
        }
    }

    trace!(path_index, "Path finished");
}

impl PathContext {
    fn admit(&self, peer: &PeerId) -> bool {
        admit(&self.seen, &self.local_peer, peer)
    }

    fn entry(&self, peer: PeerId, seq: &mut u64) -> QueueEntry {
        *seq += 1;

        QueueEntry {
            distance: peer.kad_id().xor(&self.target),
            seq: *seq,
            peer,
        }
    }

    /// Closer peers further from the target than the peer that reported them are
    /// still queried, but worth knowing about.
    fn trace_distance(&self, candidate: &PeerId, reporter: Option<&PeerId>) {
        if let Some(reporter) = reporter {
            let candidate_distance = candidate.kad_id().xor(&self.target);
            let reporter_distance = reporter.kad_id().xor(&self.target);

            if candidate_distance >= reporter_distance {
                trace!(
                    path_index = self.path_index,
                    ?candidate,
                    ?reporter,
                    "Peer reported a closer peer that is not closer than itself"
                );
            }
        }
    }

    /// Call the query function for a single peer.
    fn call(&self, peer: PeerId) -> BoxStream<'static, CallItem> {
        let timeout = self
            .query_func_timeout
            .map(|duration| (TimeoutSignal::new(duration), duration));

        let signal = match &timeout {
            Some((timeout, _)) => Signal::any([&self.signal, timeout.signal()]),
            None => self.signal.child(),
        };

        let events = (self.query_fn)(QueryContext {
            key: self.key.clone(),
            peer: peer.clone(),
            signal: signal.clone(),
            path_index: self.path_index,
            num_paths: self.num_paths,
        });

        let state = CallState {
            events,
            peer,
            signal,
            path_signal: self.signal.clone(),
            timeout,
            finished: false,
        };

        stream::unfold(state, |mut state| async move {
            if state.finished {
                return None;
            }

            let next = tokio::select! {
                biased;
                _ = state.signal.aborted() => None,
                next = state.events.next() => Some(next),
            };

            let item = match next {
                Some(Some(Ok(event))) => return Some((CallItem::Event(event), state)),
                Some(None) => return None,
                _ if state.path_signal.is_aborted() => CallItem::Aborted,
                Some(Some(Err(error))) => CallItem::Failed(state.peer.clone(), error),
                // The per call timeout fired.
                None => match &state.timeout {
                    Some((_, duration)) => {
                        CallItem::Failed(state.peer.clone(), Error::QueryFuncTimeout(*duration))
                    }
                    None => CallItem::Aborted,
                },
            };

            state.finished = true;

            Some((item, state))
        })
        .chain(stream::once(future::ready(CallItem::Done)))
        .boxed()
    }
}
