//! Peer identities and the addressing info exchanged about them.
use std::{
    fmt::{self, Debug, Display, Formatter},
    net::SocketAddr,
    str::FromStr,
    sync::Arc,
};

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::Rng;

use crate::{common::Id, Error};

/// Multihash prefix of an identity-hashed, protobuf encoded ed25519 public key:
/// identity code, digest length (36), key type field (Ed25519), key field (32 bytes).
const ED25519_IDENTITY_PREFIX: [u8; 6] = [0x00, 0x24, 0x08, 0x01, 0x12, 0x20];

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Identity of a peer on the network.
///
/// The bytes are opaque to the routing table and query engine, which only ever
/// look at the [Id] derived from them.
pub struct PeerId(Arc<[u8]>);

impl PeerId {
    /// Wrap raw peer id bytes.
    pub fn from_bytes<T: AsRef<[u8]>>(bytes: T) -> PeerId {
        PeerId(bytes.as_ref().into())
    }

    /// Peer id of an ed25519 public key, encoded as an identity multihash.
    pub fn from_public_key(key: &VerifyingKey) -> PeerId {
        let mut bytes = Vec::with_capacity(ED25519_IDENTITY_PREFIX.len() + 32);
        bytes.extend_from_slice(&ED25519_IDENTITY_PREFIX);
        bytes.extend_from_slice(key.as_bytes());

        PeerId(bytes.into())
    }

    /// Peer id of a freshly generated ed25519 key.
    pub fn random() -> PeerId {
        let secret: [u8; 32] = rand::thread_rng().gen();
        let signing_key = SigningKey::from_bytes(&secret);

        PeerId::from_public_key(&signing_key.verifying_key())
    }

    /// Returns the ed25519 public key this peer id embeds, if any.
    pub fn public_key(&self) -> Option<VerifyingKey> {
        let key = self.0.strip_prefix(&ED25519_IDENTITY_PREFIX[..])?;
        let key: [u8; 32] = key.try_into().ok()?;

        VerifyingKey::from_bytes(&key).ok()
    }

    /// The kad id of this peer, which is the SHA-256 of its bytes.
    pub fn kad_id(&self) -> Id {
        Id::from_key(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

impl Display for PeerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{byte:02x}")?;
        }

        Ok(())
    }
}

impl FromStr for PeerId {
    type Err = Error;

    /// Parse the hex encoding produced by [Display].
    fn from_str(s: &str) -> Result<PeerId, Error> {
        if s.is_empty() || s.len() % 2 != 0 || !s.is_ascii() {
            return Err(Error::InvalidPeerId(s.to_string()));
        }

        let bytes = (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| Error::InvalidPeerId(s.to_string()))?;

        Ok(PeerId(bytes.into()))
    }
}

impl Debug for PeerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // The identity prefix is the same for every ed25519 key, skip it.
        let bytes = self
            .0
            .strip_prefix(&ED25519_IDENTITY_PREFIX[..])
            .unwrap_or(&self.0[..]);
        let end = bytes.len().min(6);

        write!(f, "PeerId(")?;
        for byte in &bytes[..end] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A peer and the addresses it is known to listen on.
pub struct PeerInfo {
    pub id: PeerId,
    pub addresses: Vec<SocketAddr>,
}

impl PeerInfo {
    /// Creates a new PeerInfo from a peer id and its addresses.
    pub fn new(id: PeerId, addresses: Vec<SocketAddr>) -> PeerInfo {
        PeerInfo { id, addresses }
    }
}

impl From<PeerId> for PeerInfo {
    fn from(id: PeerId) -> PeerInfo {
        PeerInfo {
            id,
            addresses: Vec::new(),
        }
    }
}
