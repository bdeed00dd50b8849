//! Kademlia routing table and disjoint path query engine for libp2p style networks.
//!
//! - [routing_table::RoutingTable] keeps a liveness checked view of known peers,
//!   ordered by XOR distance to the local peer.
//! - [query::QueryManager] runs lookups over disjoint paths and merges their
//!   [query::QueryEvent]s into a single stream.
//! - [dht::KadDht] ties both to a [network::Network].

// Public modules
mod common;
pub mod config;
pub mod dht;
mod error;
pub mod kbucket;
pub mod network;
pub mod query;
pub mod routing_table;
pub mod signal;

pub use crate::common::{Id, PeerDistanceList, PeerId, PeerInfo, ID_BITS, ID_SIZE};
pub use crate::error::Error;
pub use bytes::Bytes;
pub use dht::KadDht;

pub use ed25519_dalek::VerifyingKey;

/// Alias for `Result<T, Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;
