//! Kademlia DHT node
//!
//! Ties a [RoutingTable], a [QueryManager] and a [RoutingTableRefresh] to a
//! [Network], and implements peer routing on top of them.

use std::{
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    vec::IntoIter,
};

use bytes::Bytes;
use futures::{
    future::BoxFuture,
    stream::{self, BoxStream},
    StreamExt,
};
use tracing::{debug, trace, warn};

use crate::{
    common::{Id, PeerDistanceList, PeerId, PeerInfo},
    config::{Config, RunOptions},
    network::{Message, Network},
    query::{
        final_peer_event, query_error_event, MessageType, QueryContext, QueryEvent, QueryFn,
        QueryManager, QueryStream,
    },
    routing_table::{ClosestPeersLookup, Pinger, RoutingTable, RoutingTableRefresh},
    signal::Signal,
    Error, Result,
};

/// Pings through the [Network].
struct NetworkPinger(Arc<dyn Network>);

impl Pinger for NetworkPinger {
    fn ping(&self, peer: &PeerId, protocol: &str) -> BoxFuture<'static, Result<()>> {
        self.0.ping(peer, protocol)
    }
}

#[derive(Clone)]
/// Peer routing: looking up peers close to a key, or a specific peer.
struct PeerRouting {
    local_peer: PeerId,
    network: Arc<dyn Network>,
    routing_table: RoutingTable,
    query_manager: QueryManager,
}

impl PeerRouting {
    fn get_closest_peers(
        &self,
        key: Bytes,
        options: RunOptions,
    ) -> Result<BoxStream<'static, Result<QueryEvent>>> {
        let target = Id::from_key(&key);
        let seeds = self.routing_table.closest_peers_default(&target);

        let mut closest = PeerDistanceList::new(target, self.routing_table.k_bucket_size());
        for peer in &seeds {
            closest.add(peer.clone());
        }

        trace!(?target, seeds = seeds.len(), "Getting closest peers");

        let query = self
            .query_manager
            .run(key.clone(), seeds, self.find_node_query(key), options)?;

        let tracked = Arc::new(Mutex::new((closest, HashMap::<PeerId, PeerInfo>::new())));
        let local_peer = self.local_peer.clone();

        Ok(with_epilogue(
            query,
            {
                let tracked = tracked.clone();

                move |event| {
                    if let QueryEvent::PeerResponse { closer, .. } = event {
                        let (closest, addresses) = &mut *tracked.lock().expect("mutex");

                        for peer in closer {
                            closest.add(peer.id.clone());
                            addresses.insert(peer.id.clone(), peer.clone());
                        }
                    }
                }
            },
            move || {
                let (closest, mut addresses) = tracked.lock().expect("mutex").clone();

                debug!(?target, found = closest.len(), "Found closest peers");

                closest
                    .into_iter()
                    .map(|peer| {
                        let info = addresses.remove(&peer).unwrap_or_else(|| peer.into());
                        final_peer_event(local_peer.clone(), info)
                    })
                    .collect()
            },
        ))
    }

    fn find_peer(
        &self,
        peer: PeerId,
        options: RunOptions,
    ) -> Result<BoxStream<'static, Result<QueryEvent>>> {
        if let Some(found) = self.routing_table.find(&peer) {
            trace!(?peer, "Found peer in routing table");

            let event = final_peer_event(self.local_peer.clone(), found.into());

            return Ok(stream::iter([Ok(event)]).boxed());
        }

        let key = Bytes::from(peer.to_vec());
        let seeds = self.routing_table.closest_peers_default(&peer.kad_id());

        let query_fn: QueryFn = {
            let find_node = self.find_node_query(key.clone());
            let target = peer.clone();

            Arc::new(move |context: QueryContext| {
                let target = target.clone();

                find_node(context)
                    .flat_map(move |event| {
                        let found = match &event {
                            Ok(QueryEvent::PeerResponse { from, closer, .. }) => closer
                                .iter()
                                .find(|info| info.id == target)
                                .map(|info| Ok(final_peer_event(from.clone(), info.clone()))),
                            _ => None,
                        };

                        stream::iter(std::iter::once(event).chain(found))
                    })
                    .boxed()
            })
        };

        let query = self.query_manager.run(key, seeds, query_fn, options)?;

        let found = Arc::new(AtomicBool::new(false));
        let local_peer = self.local_peer.clone();

        Ok(with_epilogue(
            query,
            {
                let found = found.clone();

                move |event| {
                    if let QueryEvent::FinalPeer { .. } = event {
                        found.store(true, Ordering::SeqCst);
                    }
                }
            },
            move || {
                if found.load(Ordering::SeqCst) {
                    return vec![];
                }

                debug!(?peer, "Peer not found");
                vec![query_error_event(local_peer, Error::NotFound)]
            },
        ))
    }

    /// Send FIND_NODE requests for `key`, feeding responsive peers to the routing table.
    fn find_node_query(&self, key: Bytes) -> QueryFn {
        let network = self.network.clone();
        let routing_table = self.routing_table.clone();

        Arc::new(move |context: QueryContext| {
            let message = Message::new(MessageType::FindNode, key.clone());
            let routing_table = routing_table.clone();

            network
                .send_request(&context.peer, message, context.signal)
                .inspect(move |event| {
                    if let Ok(QueryEvent::PeerResponse { from, .. }) = event {
                        if let Err(error) = routing_table.add(from.clone()) {
                            trace!(peer = ?from, ?error, "Could not add responding peer");
                        }
                    }
                })
                .boxed()
        })
    }
}

/// Forward the events of `query`, calling `on_event` for each, then yield the
/// events returned by `finish` once it completes.
///
/// If the query ends with an error, `finish` is never called.
fn with_epilogue<E, F>(
    query: QueryStream,
    on_event: E,
    finish: F,
) -> BoxStream<'static, Result<QueryEvent>>
where
    E: FnMut(&QueryEvent) + Send + 'static,
    F: FnOnce() -> Vec<QueryEvent> + Send + 'static,
{
    enum State<E, F> {
        Querying(QueryStream, E, F),
        Finishing(IntoIter<QueryEvent>),
    }

    stream::unfold(Some(State::Querying(query, on_event, finish)), |state| async move {
        match state? {
            State::Querying(mut query, mut on_event, finish) => match query.next().await {
                Some(Ok(event)) => {
                    on_event(&event);
                    Some((Ok(event), Some(State::Querying(query, on_event, finish))))
                }
                Some(Err(error)) => Some((Err(error), None)),
                None => {
                    let mut events = finish().into_iter();
                    let event = events.next()?;

                    Some((Ok(event), Some(State::Finishing(events))))
                }
            },
            State::Finishing(mut events) => {
                let event = events.next()?;

                Some((Ok(event), Some(State::Finishing(events))))
            }
        }
    })
    .boxed()
}

/// Kademlia DHT node.
pub struct KadDht {
    config: Config,
    peer_routing: PeerRouting,
    refresh: RoutingTableRefresh,
}

impl KadDht {
    pub fn new(local_peer: PeerId, config: Config, network: Arc<dyn Network>) -> Self {
        let routing_table = RoutingTable::new(
            local_peer.clone(),
            config.routing_table.clone(),
            Arc::new(NetworkPinger(network.clone())),
        );
        let query_manager = QueryManager::new(local_peer.clone(), config.query.clone());

        let peer_routing = PeerRouting {
            local_peer,
            network,
            routing_table: routing_table.clone(),
            query_manager,
        };

        let lookup: ClosestPeersLookup = {
            let peer_routing = peer_routing.clone();

            Arc::new(move |key: Bytes, signal: Signal| {
                let options = RunOptions::default().with_signal(signal);

                match peer_routing.get_closest_peers(key, options) {
                    Ok(events) => events,
                    Err(error) => stream::once(async move { Err(error) }).boxed(),
                }
            })
        };

        let refresh = RoutingTableRefresh::new(routing_table, lookup, config.refresh.clone());

        Self {
            config,
            peer_routing,
            refresh,
        }
    }

    // === Getters ===

    pub fn local_peer(&self) -> &PeerId {
        &self.peer_routing.local_peer
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.peer_routing.routing_table
    }

    pub fn query_manager(&self) -> &QueryManager {
        &self.peer_routing.query_manager
    }

    pub fn is_started(&self) -> bool {
        self.routing_table().is_started() && self.query_manager().is_started()
    }

    // === Public Methods ===

    /// Start the routing table, the query manager and the periodic refresh.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(&self) -> Result<()> {
        self.routing_table().start().await?;
        self.query_manager().start();
        self.refresh.start();

        debug!(local_peer = ?self.local_peer(), "Kad DHT started");

        Ok(())
    }

    /// Stop everything, aborting all running queries.
    pub fn stop(&self) {
        self.refresh.stop();
        self.query_manager().stop();
        self.routing_table().stop();

        debug!(local_peer = ?self.local_peer(), "Kad DHT stopped");
    }

    /// A peer supporting the DHT protocol was discovered.
    pub fn on_peer_discovered(&self, peer: PeerId) {
        if let Err(error) = self.routing_table().add(peer.clone()) {
            warn!(?peer, ?error, "Could not add discovered peer to the routing table");
        }
    }

    /// Look up the closest peers to `key`.
    ///
    /// Yields the events of the query, followed by a [QueryEvent::FinalPeer] for
    /// each of the `k_bucket_size` closest peers found.
    pub fn get_closest_peers(
        &self,
        key: impl Into<Bytes>,
        options: RunOptions,
    ) -> Result<BoxStream<'static, Result<QueryEvent>>> {
        self.peer_routing.get_closest_peers(key.into(), options)
    }

    /// Look up a specific peer.
    ///
    /// Yields a [QueryEvent::FinalPeer] for every response that contained it, or
    /// a [QueryEvent::QueryError] with [Error::NotFound] at the end if none did.
    pub fn find_peer(
        &self,
        peer: PeerId,
        options: RunOptions,
    ) -> Result<BoxStream<'static, Result<QueryEvent>>> {
        self.peer_routing.find_peer(peer, options)
    }

    /// Refresh the routing table now, regardless of when it was last refreshed.
    pub async fn refresh_routing_table(&self) {
        self.refresh.refresh(true).await
    }
}

impl Drop for KadDht {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Debug for KadDht {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("KadDht")
            .field("local_peer", self.local_peer())
            .field("routing_table", self.routing_table())
            .field("query_manager", self.query_manager())
            .finish()
    }
}
