//! Periodic routing table refresh.
//!
//! For every common prefix length the table covers, we look up a random key
//! falling in that bucket, so peers met along the way repopulate it.

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use bytes::Bytes;
use futures::{future::join_all, stream::BoxStream, StreamExt};
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use crate::{
    common::{Id, ID_SIZE},
    config::RefreshConfig,
    query::QueryEvent,
    routing_table::RoutingTable,
    signal::{Signal, TimeoutSignal},
    Result,
};

/// Refreshes are not issued for common prefix lengths above this, generating a
/// key sharing a longer prefix with the local id is too expensive.
pub const MAX_COMMON_PREFIX_LENGTH: usize = 15;

/// Multihash prefix of a SHA-256 digest.
const SHA256_MULTIHASH_PREFIX: [u8; 2] = [0x12, 0x20];

/// Looks up the closest peers to a key, until the signal is aborted.
pub type ClosestPeersLookup =
    Arc<dyn Fn(Bytes, Signal) -> BoxStream<'static, Result<QueryEvent>> + Send + Sync>;

/// Returns a random key whose kad id shares exactly `cpl` leading bits with `local_id`.
///
/// The key is shaped like a peer id, a SHA-256 multihash of random bytes.
pub fn random_key_for_cpl(local_id: &Id, cpl: usize) -> Bytes {
    let cpl = cpl.min(MAX_COMMON_PREFIX_LENGTH);
    let mut rng = rand::thread_rng();

    loop {
        let mut key = Vec::with_capacity(SHA256_MULTIHASH_PREFIX.len() + ID_SIZE);
        key.extend_from_slice(&SHA256_MULTIHASH_PREFIX);
        key.extend_from_slice(&rng.gen::<[u8; ID_SIZE]>());

        if Id::from_key(&key).common_prefix_len(local_id) == cpl {
            return key.into();
        }
    }
}

struct Inner {
    routing_table: RoutingTable,
    lookup: ClosestPeersLookup,
    config: RefreshConfig,
    /// Last refresh of every common prefix length.
    refreshed_at: Mutex<Vec<Option<Instant>>>,
}

/// Keeps the buckets of a [RoutingTable] populated.
pub struct RoutingTableRefresh {
    inner: Arc<Inner>,
    task: Mutex<Option<(JoinHandle<()>, Signal)>>,
}

impl RoutingTableRefresh {
    pub fn new(routing_table: RoutingTable, lookup: ClosestPeersLookup, config: RefreshConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                routing_table,
                lookup,
                config,
                refreshed_at: Mutex::new(vec![None; MAX_COMMON_PREFIX_LENGTH + 1]),
            }),
            task: Mutex::new(None),
        }
    }

    // === Getters ===

    pub fn is_running(&self) -> bool {
        self.task.lock().expect("mutex").is_some()
    }

    // === Public Methods ===

    /// Refresh every bucket now, then again every `refresh_interval`.
    ///
    /// Does nothing if refreshing is disabled or already running.
    pub fn start(&self) {
        if !self.inner.config.enabled {
            return;
        }

        let mut task = self.task.lock().expect("mutex");

        if task.is_some() {
            return;
        }

        let signal = Signal::new();
        let inner = self.inner.clone();
        let interval = self.inner.config.refresh_interval;

        debug!(?interval, "Refreshing routing table periodically");

        let handle = tokio::spawn({
            let signal = signal.clone();

            async move {
                let mut force = true;

                loop {
                    tokio::select! {
                        biased;
                        _ = signal.aborted() => break,
                        _ = inner.refresh_table(force) => {},
                    }

                    force = false;

                    tokio::select! {
                        biased;
                        _ = signal.aborted() => break,
                        _ = tokio::time::sleep(interval) => {},
                    }
                }
            }
        });

        *task = Some((handle, signal));
    }

    pub fn stop(&self) {
        if let Some((handle, signal)) = self.task.lock().expect("mutex").take() {
            signal.abort();
            handle.abort();
        }
    }

    /// Run a single refresh of the routing table, outside of the periodic schedule.
    pub async fn refresh(&self, force: bool) {
        self.inner.refresh_table(force).await
    }
}

impl Drop for RoutingTableRefresh {
    fn drop(&mut self) {
        self.stop()
    }
}

impl Inner {
    async fn refresh_table(&self, force: bool) {
        let cpls = self.routing_table.common_prefix_lengths();

        let deepest_cpl = cpls.iter().copied().max().unwrap_or(0);
        let peers_at_deepest_cpl = cpls.iter().filter(|cpl| **cpl == deepest_cpl).count();
        let max_cpl = deepest_cpl.min(MAX_COMMON_PREFIX_LENGTH);

        trace!(max_cpl, size = cpls.len(), force, "Refreshing routing table");

        join_all((0..=max_cpl).map(|cpl| async move {
            self.refresh_cpl(cpl, force).await;

            // Only refresh up to 2 * (cpl + 1) past a gap, the network likely has no
            // peers at the common prefix lengths between the gap and the max.
            if peers_at_deepest_cpl == 0 {
                let last = (2 * (cpl + 1)).min(max_cpl);

                for n in (cpl + 1)..=last {
                    self.refresh_cpl(n, force).await;
                }
            }
        }))
        .await;
    }

    async fn refresh_cpl(&self, cpl: usize, force: bool) {
        if !force && self.refreshed_recently(cpl) {
            trace!(cpl, "Skipping refresh, refreshed within the interval");
            return;
        }

        let key = random_key_for_cpl(self.routing_table.local_id(), cpl);
        let timeout = TimeoutSignal::new(self.config.refresh_query_timeout);

        debug!(
            cpl,
            size = self.routing_table.size(),
            "Refreshing common prefix length"
        );

        let mut events = (self.lookup)(key, timeout.signal().clone());
        let mut found = 0;

        while let Some(event) = events.next().await {
            match event {
                Ok(QueryEvent::FinalPeer { .. }) => found += 1,
                Ok(_) => {}
                Err(error) if error.is_abort() => {
                    debug!(cpl, "Refresh query timed out");
                    break;
                }
                Err(error) => {
                    error!(cpl, ?error, "Failed to refresh common prefix length");
                    break;
                }
            }
        }

        if let Some(at) = self.refreshed_at.lock().expect("mutex").get_mut(cpl) {
            *at = Some(Instant::now());
        }

        debug!(
            cpl,
            found,
            size = self.routing_table.size(),
            "Finished refreshing common prefix length"
        );
    }

    fn refreshed_recently(&self, cpl: usize) -> bool {
        let refreshed_at = self.refreshed_at.lock().expect("mutex");

        match refreshed_at.get(cpl).copied().flatten() {
            Some(at) => at.elapsed() < self.config.refresh_interval,
            None => false,
        }
    }
}

#[cfg(test)]
mod test {
    use std::{collections::HashSet, time::Duration};

    use futures::{future::BoxFuture, stream};

    use super::*;

    use crate::{
        common::PeerId,
        config::RoutingTableConfig,
        routing_table::Pinger,
    };

    struct AlivePinger;

    impl Pinger for AlivePinger {
        fn ping(&self, _peer: &PeerId, _protocol: &str) -> BoxFuture<'static, Result<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn recording_lookup() -> (ClosestPeersLookup, Arc<Mutex<Vec<Bytes>>>) {
        let keys = Arc::new(Mutex::new(vec![]));

        let lookup: ClosestPeersLookup = {
            let keys = keys.clone();

            Arc::new(move |key, _signal| {
                keys.lock().unwrap().push(key);
                stream::empty().boxed()
            })
        };

        (lookup, keys)
    }

    #[test]
    fn random_key_has_exact_cpl() {
        let local = Id::random();

        for cpl in 0..=MAX_COMMON_PREFIX_LENGTH {
            let key = random_key_for_cpl(&local, cpl);

            assert_eq!(key.len(), 34);
            assert_eq!(Id::from_key(&key).common_prefix_len(&local), cpl);
        }
    }

    #[tokio::test]
    async fn empty_table_refreshes_cpl_zero() {
        let table = RoutingTable::new(
            PeerId::random(),
            RoutingTableConfig::default(),
            Arc::new(AlivePinger),
        );
        table.start().await.unwrap();

        let (lookup, keys) = recording_lookup();
        let refresh = RoutingTableRefresh::new(table.clone(), lookup, RefreshConfig::default());

        refresh.refresh(true).await;

        let keys = keys.lock().unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(Id::from_key(&keys[0]).common_prefix_len(table.local_id()), 0);
    }

    #[tokio::test]
    async fn refreshes_every_cpl_up_to_max() {
        let table = RoutingTable::new(
            PeerId::random(),
            RoutingTableConfig::default(),
            Arc::new(AlivePinger),
        );
        table.start().await.unwrap();

        // One peer at cpl 3.
        let peer = loop {
            let peer = PeerId::random();
            if peer.kad_id().common_prefix_len(table.local_id()) == 3 {
                break peer;
            }
        };
        table.add(peer).unwrap();

        let (lookup, keys) = recording_lookup();
        let refresh = RoutingTableRefresh::new(table.clone(), lookup, RefreshConfig::default());

        refresh.refresh(true).await;

        let cpls = keys
            .lock()
            .unwrap()
            .iter()
            .map(|key| Id::from_key(key).common_prefix_len(table.local_id()))
            .collect::<HashSet<_>>();

        assert_eq!(cpls, (0..=3).collect::<HashSet<_>>());

        // Everything was refreshed within the interval.
        keys.lock().unwrap().clear();
        refresh.refresh(false).await;
        assert!(keys.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn deep_peers_cap_the_refresh_without_a_gap() {
        let table = RoutingTable::new(
            PeerId::random(),
            RoutingTableConfig::default(),
            Arc::new(AlivePinger),
        );
        table.start().await.unwrap();

        // A single peer deeper than the deepest refreshed cpl.
        let peer = (0u64..)
            .map(|i| PeerId::from_bytes(i.to_be_bytes()))
            .find(|peer| peer.kad_id().common_prefix_len(table.local_id()) == 16)
            .unwrap();
        table.add(peer).unwrap();

        let (lookup, keys) = recording_lookup();
        let refresh = RoutingTableRefresh::new(table.clone(), lookup, RefreshConfig::default());

        refresh.refresh(true).await;

        let cpls = keys
            .lock()
            .unwrap()
            .iter()
            .map(|key| Id::from_key(key).common_prefix_len(table.local_id()))
            .collect::<Vec<_>>();

        // Each cpl once, no gap extension.
        assert_eq!(cpls.len(), MAX_COMMON_PREFIX_LENGTH + 1);
        assert_eq!(
            cpls.into_iter().collect::<HashSet<_>>(),
            (0..=MAX_COMMON_PREFIX_LENGTH).collect::<HashSet<_>>()
        );
    }

    #[tokio::test]
    async fn start_and_stop() {
        let table = RoutingTable::new(
            PeerId::random(),
            RoutingTableConfig::default(),
            Arc::new(AlivePinger),
        );
        table.start().await.unwrap();

        let (lookup, keys) = recording_lookup();
        let refresh = RoutingTableRefresh::new(table, lookup, RefreshConfig::default());

        refresh.start();
        assert!(refresh.is_running());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(keys.lock().unwrap().len(), 1);

        refresh.stop();
        assert!(!refresh.is_running());
    }

    #[tokio::test]
    async fn disabled() {
        let table = RoutingTable::new(
            PeerId::random(),
            RoutingTableConfig::default(),
            Arc::new(AlivePinger),
        );

        let (lookup, _) = recording_lookup();
        let refresh = RoutingTableRefresh::new(
            table,
            lookup,
            RefreshConfig {
                enabled: false,
                ..Default::default()
            },
        );

        refresh.start();
        assert!(!refresh.is_running());
    }
}
