//! The network capabilities the DHT relies on.
//!
//! Dialing, framing and encoding are left to implementors of [Network].

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::{
    common::{PeerId, PeerInfo},
    query::{MessageType, QueryEvent, Record},
    routing_table::Pinger,
    signal::Signal,
    Result,
};

#[derive(Debug, Clone, PartialEq, Eq)]
/// A Kademlia request or response.
pub struct Message {
    pub message_type: MessageType,
    pub key: Bytes,
    pub record: Option<Record>,
    pub closer_peers: Vec<PeerInfo>,
    pub provider_peers: Vec<PeerInfo>,
}

impl Message {
    pub fn new(message_type: MessageType, key: impl Into<Bytes>) -> Self {
        Self {
            message_type,
            key: key.into(),
            record: None,
            closer_peers: vec![],
            provider_peers: vec![],
        }
    }
}

/// Sends Kademlia requests to remote peers.
pub trait Network: Pinger {
    /// Send `message` to `peer` and report the exchange as events.
    ///
    /// Implementations typically yield [QueryEvent::DialingPeer] and
    /// [QueryEvent::SendingQuery], followed by a [QueryEvent::PeerResponse]
    /// built from the answer. Failures are returned as `Err` items.
    ///
    /// The stream should end early once `signal` is aborted.
    fn send_request(
        &self,
        peer: &PeerId,
        message: Message,
        signal: Signal,
    ) -> BoxStream<'static, Result<QueryEvent>>;
}
