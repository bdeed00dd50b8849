//! Run a node over an in-memory network with every log line visible.
//!
//! Run: `cargo run --example logging`

use std::{collections::HashMap, sync::Arc, time::Duration};

use futures::{
    future::BoxFuture,
    stream::{self, BoxStream},
    StreamExt,
};
use kad_dht::{
    config::{Config, RunOptions},
    network::{Message, Network},
    query::{peer_response_event, sending_query_event, QueryEvent},
    routing_table::Pinger,
    signal::Signal,
    Error, Id, KadDht, PeerId, PeerInfo, Result,
};
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

const NETWORK_SIZE: usize = 500;

/// Every peer answers FIND_NODE with the peers it knows closest to the key,
/// after a small delay.
struct InMemoryNetwork {
    peers: HashMap<PeerId, Vec<PeerId>>,
    latency: Duration,
}

impl InMemoryNetwork {
    fn new(size: usize, latency: Duration) -> Arc<Self> {
        let all = (0..size).map(|_| PeerId::random()).collect::<Vec<_>>();

        // Each peer knows a random fifth of the network.
        let peers = all
            .iter()
            .map(|peer| {
                let known = all
                    .iter()
                    .filter(|other| *other != peer && rand::random::<u8>() < 51)
                    .cloned()
                    .collect();

                (peer.clone(), known)
            })
            .collect();

        Arc::new(Self { peers, latency })
    }

    fn bootstrap(&self) -> impl Iterator<Item = &PeerId> {
        self.peers.keys().take(10)
    }
}

impl Pinger for InMemoryNetwork {
    fn ping(&self, peer: &PeerId, _protocol: &str) -> BoxFuture<'static, Result<()>> {
        let alive = self.peers.contains_key(peer);
        let latency = self.latency;

        Box::pin(async move {
            tokio::time::sleep(latency).await;

            if alive {
                Ok(())
            } else {
                Err(Error::Static("unreachable"))
            }
        })
    }
}

impl Network for InMemoryNetwork {
    fn send_request(
        &self,
        peer: &PeerId,
        message: Message,
        _signal: Signal,
    ) -> BoxStream<'static, Result<QueryEvent>> {
        let sending = sending_query_event(peer.clone(), message.message_type);

        let Some(known) = self.peers.get(peer) else {
            return stream::iter([Ok(sending), Err(Error::Static("unreachable"))]).boxed();
        };

        let target = Id::from_key(&message.key);
        let mut closer = known.clone();
        closer.sort_by_key(|p| p.kad_id().xor(&target));
        closer.truncate(20);

        let response = peer_response_event(
            peer.clone(),
            message.message_type,
            closer.into_iter().map(PeerInfo::from).collect(),
            vec![],
            None,
        );
        let latency = self.latency;

        stream::iter([Ok(sending)])
            .chain(stream::once(async move {
                tokio::time::sleep(latency).await;
                Ok(response)
            }))
            .boxed()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_target(true)
        .with_thread_ids(true)
        .with_span_events(FmtSpan::CLOSE)
        .compact()
        .init();

    let network = InMemoryNetwork::new(NETWORK_SIZE, Duration::from_millis(20));

    let dht = KadDht::new(PeerId::random(), Config::default(), network.clone());
    dht.start().await?;

    for peer in network.bootstrap() {
        dht.on_peer_discovered(peer.clone());
    }

    info!(size = dht.routing_table().size(), "Bootstrapped");

    let events = dht
        .get_closest_peers(b"hello".to_vec(), RunOptions::default())?
        .collect::<Vec<_>>()
        .await;

    let closest = events
        .iter()
        .filter(|event| matches!(event, Ok(QueryEvent::FinalPeer { .. })))
        .count();

    info!(
        events = events.len(),
        closest,
        routing_table = dht.routing_table().size(),
        "Lookup done"
    );

    let target = network.peers.keys().nth(NETWORK_SIZE / 2).cloned();

    if let Some(target) = target {
        let mut events = dht.find_peer(target.clone(), RunOptions::default())?;

        while let Some(event) = events.next().await {
            if let Ok(QueryEvent::FinalPeer { from, .. }) = event {
                info!(?target, ?from, "Found peer");
                break;
            }
        }
    }

    dht.stop();

    Ok(())
}
