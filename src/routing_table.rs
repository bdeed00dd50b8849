//! Kademlia routing table
//!
//! A [KBucketTree] behind a start/stop lifecycle, with a bounded concurrency
//! queue of liveness checks that decides whether contacts of full buckets get
//! replaced by newly discovered peers.

mod refresh;

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, Weak,
    },
};

use futures::future::{join_all, BoxFuture};
use tokio::{
    sync::Semaphore,
    task::{JoinHandle, JoinSet},
};
use tracing::{debug, trace, warn};

use crate::{
    common::{Id, PeerId},
    config::RoutingTableConfig,
    kbucket::{AddOutcome, Contact, KBucketTree},
    signal::Signal,
    Error, Result,
};

pub use refresh::{
    random_key_for_cpl, ClosestPeersLookup, RoutingTableRefresh, MAX_COMMON_PREFIX_LENGTH,
};

/// Checks whether a peer is still alive.
pub trait Pinger: Send + Sync {
    /// Resolves to `Ok(())` if `peer` answered a ping on `protocol`.
    fn ping(&self, peer: &PeerId, protocol: &str) -> BoxFuture<'static, Result<()>>;
}

#[derive(Debug)]
/// Old contacts to ping before `new` can take their place.
struct PingTask {
    old: Vec<Contact>,
    new: Contact,
}

struct PingQueue {
    sender: flume::Sender<PingTask>,
    /// Fired on stop, no eviction happens after that.
    signal: Signal,
    dispatcher: JoinHandle<()>,
    /// Queued and in flight tasks.
    pending: Arc<AtomicUsize>,
    /// Old contacts with a queued or in flight ping.
    pinging: Arc<Mutex<HashSet<Id>>>,
}

struct Inner {
    local_peer: PeerId,
    local_id: Id,
    config: RoutingTableConfig,
    pinger: Arc<dyn Pinger>,
    tree: Mutex<Option<KBucketTree>>,
    ping_queue: Mutex<Option<PingQueue>>,
}

#[derive(Clone)]
/// Kademlia routing table of the local peer.
pub struct RoutingTable {
    inner: Arc<Inner>,
}

impl RoutingTable {
    pub fn new(local_peer: PeerId, config: RoutingTableConfig, pinger: Arc<dyn Pinger>) -> Self {
        let local_id = local_peer.kad_id();

        Self {
            inner: Arc::new(Inner {
                local_peer,
                local_id,
                config,
                pinger,
                tree: Mutex::new(None),
                ping_queue: Mutex::new(None),
            }),
        }
    }

    // === Getters ===

    pub fn local_peer(&self) -> &PeerId {
        &self.inner.local_peer
    }

    /// Returns the kad id of the local peer, where distances are measured from.
    pub fn local_id(&self) -> &Id {
        &self.inner.local_id
    }

    pub fn k_bucket_size(&self) -> usize {
        self.inner.config.k_bucket_size
    }

    pub fn config(&self) -> &RoutingTableConfig {
        &self.inner.config
    }

    pub fn is_started(&self) -> bool {
        self.inner.tree.lock().expect("mutex").is_some()
    }

    /// Number of contacts, `0` when not started.
    pub fn size(&self) -> usize {
        self.inner
            .tree
            .lock()
            .expect("mutex")
            .as_ref()
            .map(|tree| tree.len())
            .unwrap_or(0)
    }

    /// Number of liveness checks queued or in flight.
    pub fn pending_pings(&self) -> usize {
        self.inner
            .ping_queue
            .lock()
            .expect("mutex")
            .as_ref()
            .map(|queue| queue.pending.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Common prefix length of every contact with the local id.
    pub fn common_prefix_lengths(&self) -> Vec<usize> {
        let tree = self.inner.tree.lock().expect("mutex");

        match tree.as_ref() {
            Some(tree) => tree
                .iter()
                .map(|contact| contact.id.common_prefix_len(&self.inner.local_id))
                .collect(),
            None => vec![],
        }
    }

    // === Public Methods ===

    /// Create an empty tree and start processing liveness checks.
    ///
    /// Must be called from within a tokio runtime. Calling it on a started table is a no-op.
    pub async fn start(&self) -> Result<()> {
        let mut tree = self.inner.tree.lock().expect("mutex");

        if tree.is_some() {
            return Ok(());
        }

        *tree = Some(KBucketTree::new(
            self.inner.local_id,
            self.inner.config.k_bucket_size,
            self.inner.config.number_of_nodes_to_ping,
        ));

        let (sender, receiver) = flume::unbounded();
        let signal = Signal::new();
        let pending = Arc::new(AtomicUsize::new(0));
        let pinging = Arc::new(Mutex::new(HashSet::new()));

        let dispatcher = tokio::spawn(dispatch(
            Arc::downgrade(&self.inner),
            receiver,
            signal.clone(),
            pending.clone(),
            pinging.clone(),
        ));

        *self.inner.ping_queue.lock().expect("mutex") = Some(PingQueue {
            sender,
            signal,
            dispatcher,
            pending,
            pinging,
        });

        debug!(local_id = ?self.inner.local_id, "Routing table started");

        Ok(())
    }

    /// Drop every contact, pending and in flight liveness check.
    pub fn stop(&self) {
        if let Some(queue) = self.inner.ping_queue.lock().expect("mutex").take() {
            queue.signal.abort();
            queue.dispatcher.abort();
        }

        if self.inner.tree.lock().expect("mutex").take().is_some() {
            debug!(local_id = ?self.inner.local_id, "Routing table stopped");
        }
    }

    /// Add a peer to the routing table.
    ///
    /// If its bucket is full and can't be split, the oldest contacts of that bucket
    /// get pinged in the background, and the peer is only added if they are all
    /// unresponsive.
    pub fn add(&self, peer: PeerId) -> Result<()> {
        let contact = Contact::new(peer);

        let outcome = {
            let mut tree = self.inner.tree.lock().expect("mutex");
            let tree = tree.as_mut().ok_or(Error::NotStarted("RoutingTable"))?;

            tree.add(contact)
        };

        match outcome {
            AddOutcome::Added => {
                trace!(size = self.size(), "Added peer to routing table");
            }
            AddOutcome::Updated | AddOutcome::IsLocal => {}
            AddOutcome::Ping { old, new } => self.inner.schedule_ping(PingTask { old, new }),
        }

        Ok(())
    }

    /// Remove a peer from the routing table if it is present.
    pub fn remove(&self, peer: &PeerId) -> Result<()> {
        let mut tree = self.inner.tree.lock().expect("mutex");
        let tree = tree.as_mut().ok_or(Error::NotStarted("RoutingTable"))?;

        if tree.remove(&peer.kad_id()).is_some() {
            trace!(?peer, "Removed peer from routing table");
        }

        Ok(())
    }

    /// Returns the peer if it is in the routing table.
    pub fn find(&self, peer: &PeerId) -> Option<PeerId> {
        let tree = self.inner.tree.lock().expect("mutex");

        tree.as_ref()?
            .get(&peer.kad_id())
            .map(|contact| contact.peer.clone())
    }

    /// Returns the closest peer to a kad id.
    pub fn closest_peer(&self, key: &Id) -> Option<PeerId> {
        self.closest_peers(key, 1).into_iter().next()
    }

    /// Returns up to `count` peers ordered by ascending distance to a kad id.
    pub fn closest_peers(&self, key: &Id, count: usize) -> Vec<PeerId> {
        let tree = self.inner.tree.lock().expect("mutex");

        match tree.as_ref() {
            Some(tree) => tree
                .closest(key, count)
                .into_iter()
                .map(|contact| contact.peer)
                .collect(),
            None => vec![],
        }
    }

    /// Same as [Self::closest_peers] with `count` = [RoutingTableConfig::k_bucket_size].
    pub fn closest_peers_default(&self, key: &Id) -> Vec<PeerId> {
        self.closest_peers(key, self.k_bucket_size())
    }
}

impl std::fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingTable")
            .field("local_id", &self.inner.local_id)
            .field("size", &self.size())
            .field("pending_pings", &self.pending_pings())
            .finish()
    }
}

impl Inner {
    fn schedule_ping(&self, task: PingTask) {
        let queue = self.ping_queue.lock().expect("mutex");

        let queue = match queue.as_ref() {
            Some(queue) => queue,
            None => return,
        };

        {
            let mut pinging = queue.pinging.lock().expect("mutex");

            if task.old.iter().any(|contact| pinging.contains(&contact.id)) {
                trace!(
                    new = ?task.new.peer,
                    "Old contacts already being pinged, discarding new contact"
                );
                return;
            }

            pinging.extend(task.old.iter().map(|contact| contact.id));
        }

        trace!(new = ?task.new.peer, old = task.old.len(), "Bucket full, scheduling ping");

        queue.pending.fetch_add(1, Ordering::SeqCst);

        if let Err(flume::SendError(task)) = queue.sender.send(task) {
            queue.pending.fetch_sub(1, Ordering::SeqCst);
            release(&queue.pinging, &task.old);
        }
    }

    /// Ping the old contacts of a full bucket.
    ///
    /// If any of them answers, the bucket is left untouched and the new contact
    /// discarded. Otherwise they are all evicted and the new contact added.
    async fn check(self: Arc<Self>, task: PingTask, signal: Signal) {
        let PingTask { old, new } = task;

        let results = join_all(old.iter().map(|contact| {
            let ping = self.pinger.ping(&contact.peer, &self.config.protocol);
            let timeout = self.config.ping_timeout;

            async move {
                trace!(peer = ?contact.peer, "Pinging old contact");

                match tokio::time::timeout(timeout, ping).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::PingTimeout(timeout)),
                }
            }
        }))
        .await;

        // Failures while stopping are caused by the shutdown, not by the peer.
        if signal.is_aborted() {
            return;
        }

        let mut tree = self.tree.lock().expect("mutex");
        let tree = match tree.as_mut() {
            Some(tree) => tree,
            None => return,
        };

        let responded = results.iter().filter(|result| result.is_ok()).count();

        if responded > 0 {
            trace!(new = ?new.peer, responded, "Old contacts are alive, discarding new contact");
            return;
        }

        for (contact, result) in old.iter().zip(results) {
            if let Err(error) = result {
                debug!(peer = ?contact.peer, ?error, "Evicting old contact after ping failed");
                tree.remove(&contact.id);
            }
        }

        match tree.add(new) {
            AddOutcome::Added | AddOutcome::Updated | AddOutcome::IsLocal => {}
            AddOutcome::Ping { new, .. } => {
                debug!(new = ?new.peer, "Bucket still full after eviction, discarding new contact");
            }
        }
    }
}

/// Run queued liveness checks, at most `ping_concurrency` at a time.
async fn dispatch(
    inner: Weak<Inner>,
    receiver: flume::Receiver<PingTask>,
    signal: Signal,
    pending: Arc<AtomicUsize>,
    pinging: Arc<Mutex<HashSet<Id>>>,
) {
    let concurrency = match inner.upgrade() {
        Some(inner) => inner.config.ping_concurrency.max(1),
        None => return,
    };
    let semaphore = Arc::new(Semaphore::new(concurrency));

    // Dropped with the dispatcher, aborting every check in flight.
    let mut checks = JoinSet::new();

    loop {
        let task = tokio::select! {
            biased;
            _ = signal.aborted() => break,
            Some(_) = checks.join_next(), if !checks.is_empty() => continue,
            task = receiver.recv_async() => match task {
                Ok(task) => task,
                Err(_) => break,
            },
        };

        let permit = tokio::select! {
            _ = signal.aborted() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let inner = match inner.upgrade() {
            Some(inner) => inner,
            None => break,
        };

        let signal = signal.clone();
        let pending = pending.clone();
        let pinging = pinging.clone();
        let old = task.old.clone();

        checks.spawn(async move {
            inner.check(task, signal).await;

            release(&pinging, &old);
            pending.fetch_sub(1, Ordering::SeqCst);
            drop(permit);
        });
    }

    if !checks.is_empty() {
        warn!(in_flight = checks.len(), "Aborting in flight pings");
    }
}

/// Allow `contacts` to be pinged again.
fn release(pinging: &Mutex<HashSet<Id>>, contacts: &[Contact]) {
    let mut pinging = pinging.lock().expect("mutex");

    for contact in contacts {
        pinging.remove(&contact.id);
    }
}

#[cfg(test)]
mod test {
    use std::{collections::HashSet, time::Duration};

    use super::*;

    use crate::common::ID_SIZE;

    #[derive(Default)]
    struct MockPinger {
        alive: Mutex<HashSet<PeerId>>,
        pinged: Mutex<Vec<PeerId>>,
    }

    impl Pinger for MockPinger {
        fn ping(&self, peer: &PeerId, _protocol: &str) -> BoxFuture<'static, Result<()>> {
            self.pinged.lock().unwrap().push(peer.clone());
            let alive = self.alive.lock().unwrap().contains(peer);

            Box::pin(async move {
                if alive {
                    Ok(())
                } else {
                    Err(Error::Static("unreachable"))
                }
            })
        }
    }

    /// Peers whose kad ids have their first bit different from `local`, so they
    /// all land in the same bucket after the first split.
    fn far_peers(local: &Id, count: usize) -> Vec<PeerId> {
        let mut peers = vec![];

        while peers.len() < count {
            let peer = PeerId::random();
            if peer.kad_id().bit(0) != local.bit(0) {
                peers.push(peer);
            }
        }

        peers
    }

    fn near_peer(local: &Id) -> PeerId {
        loop {
            let peer = PeerId::random();
            if peer.kad_id().bit(0) == local.bit(0) {
                return peer;
            }
        }
    }

    fn config(k: usize) -> RoutingTableConfig {
        RoutingTableConfig {
            k_bucket_size: k,
            ping_timeout: Duration::from_millis(100),
            ..Default::default()
        }
    }

    async fn wait_for_pings(table: &RoutingTable) {
        for _ in 0..100 {
            if table.pending_pings() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        panic!("pings never finished");
    }

    /// A started table with k=2, whose far bucket is full and not splittable.
    async fn full_table(pinger: Arc<MockPinger>) -> (RoutingTable, Vec<PeerId>) {
        full_table_pinging(pinger, 1).await
    }

    async fn full_table_pinging(
        pinger: Arc<MockPinger>,
        number_of_nodes_to_ping: usize,
    ) -> (RoutingTable, Vec<PeerId>) {
        let local = PeerId::random();
        let config = RoutingTableConfig {
            number_of_nodes_to_ping,
            ..config(2)
        };
        let table = RoutingTable::new(local.clone(), config, pinger);
        table.start().await.unwrap();

        let far = far_peers(table.local_id(), 3);

        table.add(far[0].clone()).unwrap();
        table.add(far[1].clone()).unwrap();
        table.add(near_peer(table.local_id())).unwrap();

        assert_eq!(table.size(), 3);

        (table, far)
    }

    #[tokio::test]
    async fn not_started() {
        let table = RoutingTable::new(
            PeerId::random(),
            Default::default(),
            Arc::new(MockPinger::default()),
        );

        assert!(!table.is_started());
        assert!(matches!(
            table.add(PeerId::random()),
            Err(Error::NotStarted(_))
        ));
        assert!(matches!(
            table.remove(&PeerId::random()),
            Err(Error::NotStarted(_))
        ));
        assert_eq!(table.size(), 0);
        assert!(table.closest_peers(&Id::random(), 20).is_empty());

        table.start().await.unwrap();
        assert!(table.is_started());

        table.stop();
        assert!(matches!(
            table.add(PeerId::random()),
            Err(Error::NotStarted(_))
        ));
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let table = RoutingTable::new(
            PeerId::random(),
            Default::default(),
            Arc::new(MockPinger::default()),
        );
        table.start().await.unwrap();

        let peer = PeerId::random();

        table.add(peer.clone()).unwrap();
        table.add(peer.clone()).unwrap();

        assert_eq!(table.size(), 1);
        assert_eq!(table.find(&peer), Some(peer.clone()));

        table.remove(&peer).unwrap();
        table.remove(&peer).unwrap();
        assert_eq!(table.size(), 0);
        assert_eq!(table.find(&peer), None);
    }

    #[tokio::test]
    async fn ignore_local_peer() {
        let local = PeerId::random();
        let table = RoutingTable::new(
            local.clone(),
            Default::default(),
            Arc::new(MockPinger::default()),
        );
        table.start().await.unwrap();

        table.add(local).unwrap();

        assert_eq!(table.size(), 0);
    }

    #[tokio::test]
    async fn closest_peers() {
        let table = RoutingTable::new(
            PeerId::random(),
            Default::default(),
            Arc::new(MockPinger::default()),
        );
        table.start().await.unwrap();

        for _ in 0..100 {
            table.add(PeerId::random()).unwrap();
        }

        let key = Id([7; ID_SIZE]);
        let closest = table.closest_peers_default(&key);

        assert_eq!(closest.len(), 20);
        assert_eq!(table.closest_peer(&key), Some(closest[0].clone()));

        let distances = closest
            .iter()
            .map(|p| p.kad_id().xor(&key))
            .collect::<Vec<_>>();
        let mut sorted = distances.clone();
        sorted.sort();
        assert_eq!(distances, sorted);

        assert_eq!(table.closest_peers(&key, 5), closest[..5].to_vec());
    }

    #[tokio::test]
    async fn evicts_unresponsive_contact() {
        let pinger = Arc::new(MockPinger::default());
        let (table, far) = full_table(pinger.clone()).await;

        let new = far_peers(table.local_id(), 1).remove(0);
        table.add(new.clone()).unwrap();

        wait_for_pings(&table).await;

        // The oldest contact is pinged, fails and gets replaced.
        assert_eq!(*pinger.pinged.lock().unwrap(), vec![far[0].clone()]);
        assert_eq!(table.find(&far[0]), None);
        assert_eq!(table.find(&far[1]), Some(far[1].clone()));
        assert_eq!(table.find(&new), Some(new));
        assert_eq!(table.size(), 3);
    }

    #[tokio::test]
    async fn keeps_responsive_contact() {
        let pinger = Arc::new(MockPinger::default());
        let (table, far) = full_table(pinger.clone()).await;

        pinger.alive.lock().unwrap().insert(far[0].clone());

        let new = far_peers(table.local_id(), 1).remove(0);
        table.add(new.clone()).unwrap();

        wait_for_pings(&table).await;

        assert_eq!(*pinger.pinged.lock().unwrap(), vec![far[0].clone()]);
        assert_eq!(table.find(&far[0]), Some(far[0].clone()));
        assert_eq!(table.find(&new), None);
        assert_eq!(table.size(), 3);
    }

    #[tokio::test]
    async fn any_responsive_contact_keeps_the_bucket() {
        let pinger = Arc::new(MockPinger::default());
        let (table, far) = full_table_pinging(pinger.clone(), 2).await;

        pinger.alive.lock().unwrap().insert(far[1].clone());

        let new = far_peers(table.local_id(), 1).remove(0);
        table.add(new.clone()).unwrap();

        wait_for_pings(&table).await;

        assert_eq!(pinger.pinged.lock().unwrap().len(), 2);
        assert_eq!(table.find(&far[0]), Some(far[0].clone()));
        assert_eq!(table.find(&far[1]), Some(far[1].clone()));
        assert_eq!(table.find(&new), None);
        assert_eq!(table.size(), 3);
    }

    #[tokio::test]
    async fn all_unresponsive_contacts_are_evicted() {
        let pinger = Arc::new(MockPinger::default());
        let (table, far) = full_table_pinging(pinger.clone(), 2).await;

        let new = far_peers(table.local_id(), 1).remove(0);
        table.add(new.clone()).unwrap();

        wait_for_pings(&table).await;

        assert_eq!(table.find(&far[0]), None);
        assert_eq!(table.find(&far[1]), None);
        assert_eq!(table.find(&new), Some(new));
        assert_eq!(table.size(), 2);
    }

    #[tokio::test]
    async fn one_ping_per_old_contact() {
        let pinger = Arc::new(MockPinger::default());
        let (table, far) = full_table(pinger.clone()).await;

        let new = far_peers(table.local_id(), 5);
        for peer in &new {
            table.add(peer.clone()).unwrap();
        }
        // Announced again while the first check is still queued.
        table.add(new[0].clone()).unwrap();

        assert_eq!(table.pending_pings(), 1);

        wait_for_pings(&table).await;

        assert_eq!(*pinger.pinged.lock().unwrap(), vec![far[0].clone()]);
        assert_eq!(table.find(&far[0]), None);
        assert_eq!(table.find(&new[0]), Some(new[0].clone()));
        assert!(new[1..].iter().all(|peer| table.find(peer).is_none()));
        assert_eq!(table.size(), 3);
    }

    /// Fails every ping after a while, keeping track of how many overlap.
    #[derive(Default)]
    struct SlowPinger {
        current: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl Pinger for SlowPinger {
        fn ping(&self, _peer: &PeerId, _protocol: &str) -> BoxFuture<'static, Result<()>> {
            let current = self.current.clone();
            let peak = self.peak.clone();

            Box::pin(async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);

                tokio::time::sleep(Duration::from_millis(50)).await;

                current.fetch_sub(1, Ordering::SeqCst);
                Err(Error::Static("unreachable"))
            })
        }
    }

    fn peer_with_cpl(local: &Id, cpl: usize) -> PeerId {
        loop {
            let peer = PeerId::random();
            if peer.kad_id().common_prefix_len(local) == cpl {
                return peer;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ping_concurrency_is_bounded() {
        let pinger = Arc::new(SlowPinger::default());
        let config = RoutingTableConfig {
            ping_concurrency: 2,
            ..config(1)
        };
        let table = RoutingTable::new(PeerId::random(), config, pinger.clone());
        table.start().await.unwrap();

        // One full bucket per common prefix length 0..=4, plus the deepest one.
        for cpl in 0..=5 {
            table.add(peer_with_cpl(table.local_id(), cpl)).unwrap();
        }
        assert_eq!(table.size(), 6);

        let new = (0..5)
            .map(|cpl| peer_with_cpl(table.local_id(), cpl))
            .collect::<Vec<_>>();
        for peer in &new {
            table.add(peer.clone()).unwrap();
        }

        assert_eq!(table.pending_pings(), 5);

        wait_for_pings(&table).await;

        assert_eq!(pinger.peak.load(Ordering::SeqCst), 2);
        assert!(new.iter().all(|peer| table.find(peer).is_some()));
        assert_eq!(table.size(), 6);
    }

    struct HangingPinger;

    impl Pinger for HangingPinger {
        fn ping(&self, _peer: &PeerId, _protocol: &str) -> BoxFuture<'static, Result<()>> {
            Box::pin(futures::future::pending())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ping_timeout_evicts() {
        let local = PeerId::random();
        let table = RoutingTable::new(local, config(2), Arc::new(HangingPinger));
        table.start().await.unwrap();

        let far = far_peers(table.local_id(), 3);
        table.add(far[0].clone()).unwrap();
        table.add(far[1].clone()).unwrap();
        table.add(near_peer(table.local_id())).unwrap();

        table.add(far[2].clone()).unwrap();
        assert_eq!(table.pending_pings(), 1);

        wait_for_pings(&table).await;

        assert_eq!(table.find(&far[0]), None);
        assert_eq!(table.find(&far[2]), Some(far[2].clone()));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_drops_pending_pings() {
        let local = PeerId::random();
        let table = RoutingTable::new(local, config(2), Arc::new(HangingPinger));
        table.start().await.unwrap();

        let far = far_peers(table.local_id(), 3);
        table.add(far[0].clone()).unwrap();
        table.add(far[1].clone()).unwrap();
        table.add(near_peer(table.local_id())).unwrap();
        table.add(far[2].clone()).unwrap();

        table.stop();

        assert_eq!(table.pending_pings(), 0);
        assert_eq!(table.size(), 0);

        // Restarting gives an empty table.
        table.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(table.size(), 0);
    }
}
