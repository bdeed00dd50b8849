//! Events emitted while running a query.

use std::{sync::Arc, time::SystemTime};

use bytes::Bytes;

use crate::{
    common::{PeerId, PeerInfo},
    Error,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Kademlia message kinds.
pub enum MessageType {
    PutValue = 0,
    GetValue = 1,
    AddProvider = 2,
    GetProviders = 3,
    FindNode = 4,
    Ping = 5,
}

impl MessageType {
    pub fn name(&self) -> &'static str {
        match self {
            MessageType::PutValue => "PUT_VALUE",
            MessageType::GetValue => "GET_VALUE",
            MessageType::AddProvider => "ADD_PROVIDER",
            MessageType::GetProviders => "GET_PROVIDERS",
            MessageType::FindNode => "FIND_NODE",
            MessageType::Ping => "PING",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A value stored in the DHT under a key.
pub struct Record {
    pub key: Bytes,
    pub value: Bytes,
    /// When the record was received from the network, if it was.
    pub time_received: Option<SystemTime>,
}

impl Record {
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            time_received: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Numeric discriminant of a [QueryEvent].
pub enum EventType {
    SendingQuery = 0,
    PeerResponse = 1,
    FinalPeer = 2,
    QueryError = 3,
    Provider = 4,
    Value = 5,
    AddingPeer = 6,
    DialingPeer = 7,
}

#[derive(Debug, Clone)]
/// Progress and results of a query.
///
/// Produced by the query function for every peer it contacts, and forwarded
/// unmodified to the consumer of the run.
pub enum QueryEvent {
    /// A message is about to be sent to `to`.
    SendingQuery {
        to: PeerId,
        message_type: MessageType,
    },
    /// A connection to `peer` is being established.
    DialingPeer { peer: PeerId },
    /// `from` answered a query.
    PeerResponse {
        from: PeerId,
        message_type: MessageType,
        closer: Vec<PeerInfo>,
        providers: Vec<PeerInfo>,
        record: Option<Record>,
    },
    /// `peer` is one of the results of the lookup.
    FinalPeer { from: PeerId, peer: PeerInfo },
    /// Querying `from` failed, the rest of the query carries on.
    QueryError { from: PeerId, error: Arc<Error> },
    /// `from` knows providers for the key.
    Provider {
        from: PeerId,
        providers: Vec<PeerInfo>,
    },
    /// `from` returned a value for the key.
    Value { from: PeerId, value: Bytes },
    /// `peer` is being added to the routing table.
    AddingPeer { peer: PeerId },
}

impl QueryEvent {
    // === Getters ===

    /// Discriminant name, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            QueryEvent::SendingQuery { .. } => "SENDING_QUERY",
            QueryEvent::DialingPeer { .. } => "DIALING_PEER",
            QueryEvent::PeerResponse { .. } => "PEER_RESPONSE",
            QueryEvent::FinalPeer { .. } => "FINAL_PEER",
            QueryEvent::QueryError { .. } => "QUERY_ERROR",
            QueryEvent::Provider { .. } => "PROVIDER",
            QueryEvent::Value { .. } => "VALUE",
            QueryEvent::AddingPeer { .. } => "ADDING_PEER",
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            QueryEvent::SendingQuery { .. } => EventType::SendingQuery,
            QueryEvent::DialingPeer { .. } => EventType::DialingPeer,
            QueryEvent::PeerResponse { .. } => EventType::PeerResponse,
            QueryEvent::FinalPeer { .. } => EventType::FinalPeer,
            QueryEvent::QueryError { .. } => EventType::QueryError,
            QueryEvent::Provider { .. } => EventType::Provider,
            QueryEvent::Value { .. } => EventType::Value,
            QueryEvent::AddingPeer { .. } => EventType::AddingPeer,
        }
    }

    /// The peer this event originates from, for events received from the network.
    pub fn from(&self) -> Option<&PeerId> {
        match self {
            QueryEvent::PeerResponse { from, .. }
            | QueryEvent::FinalPeer { from, .. }
            | QueryEvent::QueryError { from, .. }
            | QueryEvent::Provider { from, .. }
            | QueryEvent::Value { from, .. } => Some(from),
            _ => None,
        }
    }

    /// The peer this event is directed at, for outgoing events.
    pub fn to(&self) -> Option<&PeerId> {
        match self {
            QueryEvent::SendingQuery { to, .. } => Some(to),
            QueryEvent::DialingPeer { peer } | QueryEvent::AddingPeer { peer } => Some(peer),
            _ => None,
        }
    }

    /// Closer peers carried by a [QueryEvent::PeerResponse].
    pub fn closer_peers(&self) -> &[PeerInfo] {
        match self {
            QueryEvent::PeerResponse { closer, .. } => closer,
            _ => &[],
        }
    }
}

// === Constructors ===

pub fn sending_query_event(to: PeerId, message_type: MessageType) -> QueryEvent {
    QueryEvent::SendingQuery { to, message_type }
}

pub fn peer_response_event(
    from: PeerId,
    message_type: MessageType,
    closer: Vec<PeerInfo>,
    providers: Vec<PeerInfo>,
    record: Option<Record>,
) -> QueryEvent {
    QueryEvent::PeerResponse {
        from,
        message_type,
        closer,
        providers,
        record,
    }
}

pub fn final_peer_event(from: PeerId, peer: PeerInfo) -> QueryEvent {
    QueryEvent::FinalPeer { from, peer }
}

pub fn query_error_event(from: PeerId, error: impl Into<Arc<Error>>) -> QueryEvent {
    QueryEvent::QueryError {
        from,
        error: error.into(),
    }
}

pub fn provider_event(from: PeerId, providers: Vec<PeerInfo>) -> QueryEvent {
    QueryEvent::Provider { from, providers }
}

pub fn value_event(from: PeerId, value: impl Into<Bytes>) -> QueryEvent {
    QueryEvent::Value {
        from,
        value: value.into(),
    }
}

pub fn adding_peer_event(peer: PeerId) -> QueryEvent {
    QueryEvent::AddingPeer { peer }
}

pub fn dialing_peer_event(peer: PeerId) -> QueryEvent {
    QueryEvent::DialingPeer { peer }
}
