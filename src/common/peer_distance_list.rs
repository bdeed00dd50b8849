use std::vec::IntoIter;

use crate::common::{Id, PeerId};

#[derive(Debug, Clone)]
struct PeerDistance {
    peer: PeerId,
    distance: Id,
}

/// Keeps track of the `capacity` closest peers to an origin kad id seen so far.
#[derive(Debug, Clone)]
pub struct PeerDistanceList {
    origin: Id,
    capacity: usize,
    peer_distances: Vec<PeerDistance>,
}

impl PeerDistanceList {
    pub fn new(origin: Id, capacity: usize) -> Self {
        Self {
            origin,
            capacity,
            peer_distances: Vec::with_capacity(capacity + 1),
        }
    }

    // === Getters ===

    pub fn origin(&self) -> Id {
        self.origin
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.peer_distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peer_distances.is_empty()
    }

    /// Peers ordered by ascending distance to the origin.
    pub fn peers(&self) -> Vec<PeerId> {
        self.peer_distances.iter().map(|pd| pd.peer.clone()).collect()
    }

    // === Public Methods ===

    /// Add a peer, unless it is already present or further than every tracked
    /// peer in a full list.
    pub fn add(&mut self, peer: PeerId) {
        let id = peer.kad_id();
        self.add_with_id(peer, id)
    }

    /// Same as [Self::add] with an already computed kad id.
    pub fn add_with_id(&mut self, peer: PeerId, id: Id) {
        if self.peer_distances.iter().any(|pd| pd.peer == peer) {
            return;
        }

        let distance = id.xor(&self.origin);

        // Equal distances keep insertion order.
        let pos = self
            .peer_distances
            .partition_point(|pd| pd.distance <= distance);

        self.peer_distances
            .insert(pos, PeerDistance { peer, distance });
        self.peer_distances.truncate(self.capacity);
    }

    /// Returns `true` if any of the passed peers is closer to the origin than the
    /// furthest tracked peer.
    pub fn any_closer(&self, candidates: &[PeerId]) -> bool {
        if candidates.is_empty() {
            return false;
        }

        let furthest = match self.peer_distances.last() {
            Some(last) => last.distance,
            None => return true,
        };

        candidates
            .iter()
            .any(|peer| peer.kad_id().xor(&self.origin) < furthest)
    }
}

impl IntoIterator for PeerDistanceList {
    type Item = PeerId;
    type IntoIter = IntoIter<PeerId>;

    fn into_iter(self) -> Self::IntoIter {
        self.peer_distances
            .into_iter()
            .map(|pd| pd.peer)
            .collect::<Vec<_>>()
            .into_iter()
    }
}
