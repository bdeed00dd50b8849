//! Kbuckets
//!
//! A binary tree of buckets, stored as an arena of nodes addressed by index,
//! with the buckets themselves kept in a separate arena the leaves point into.
//! Only the bucket covering the local id's prefix is ever split, so the tree
//! stays a single spine with one full-depth leaf per common prefix length.

use std::fmt::{self, Debug, Formatter};

use crate::common::{Id, PeerId, ID_BITS};

/// The index of the root of the tree in the arena.
const ROOT: usize = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A known peer and its kad id.
pub struct Contact {
    pub id: Id,
    pub peer: PeerId,
}

impl Contact {
    pub fn new(peer: PeerId) -> Self {
        Self {
            id: peer.kad_id(),
            peer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// What happened to a contact passed to [KBucketTree::add].
pub enum AddOutcome {
    /// The contact was inserted.
    Added,
    /// The contact was already known and moved to the most recently seen end of its bucket.
    Updated,
    /// The contact is the local node.
    IsLocal,
    /// The bucket is full and can't be split.
    ///
    /// The oldest contacts of that bucket should be pinged, and `new` only
    /// added if they don't respond.
    Ping { old: Vec<Contact>, new: Contact },
}

#[derive(Debug, Default)]
struct Bucket {
    /// Sorted by the least recently seen.
    contacts: Vec<Contact>,
    dont_split: bool,
}

#[derive(Debug, Clone, Copy)]
enum Node {
    /// Index of the bucket in [KBucketTree::buckets].
    Leaf(usize),
    /// `left` holds the ids with a `0` at this depth, `right` the ones with a `1`.
    Branch { left: usize, right: usize },
}

#[derive(Debug, Clone, Copy)]
/// Position of the leaf covering an id.
struct LeafRef {
    node: usize,
    bucket: usize,
    depth: usize,
}

/// Kbuckets tree rooted at the local node's id.
pub struct KBucketTree {
    local_id: Id,
    /// K (as in k-bucket) is the maximum number of contacts in a bucket.
    k: usize,
    number_of_nodes_to_ping: usize,
    nodes: Vec<Node>,
    buckets: Vec<Bucket>,
    len: usize,
}

impl KBucketTree {
    pub fn new(local_id: Id, k: usize, number_of_nodes_to_ping: usize) -> Self {
        Self {
            local_id,
            k: k.max(1),
            number_of_nodes_to_ping: number_of_nodes_to_ping.max(1),
            nodes: vec![Node::Leaf(0)],
            buckets: vec![Bucket::default()],
            len: 0,
        }
    }

    // === Getters ===

    pub fn local_id(&self) -> &Id {
        &self.local_id
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of contacts in the tree.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of leaf buckets.
    pub fn buckets_count(&self) -> usize {
        self.buckets.len()
    }

    /// Iterate over every contact, bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        self.buckets.iter().flat_map(|bucket| bucket.contacts.iter())
    }

    // === Public Methods ===

    /// Add a contact, splitting buckets on the local id's side as needed.
    pub fn add(&mut self, contact: Contact) -> AddOutcome {
        if contact.id == self.local_id {
            return AddOutcome::IsLocal;
        }

        loop {
            let leaf = self.leaf_for(&contact.id);
            let bucket = &mut self.buckets[leaf.bucket];

            if let Some(position) = bucket.contacts.iter().position(|c| c.id == contact.id) {
                bucket.contacts.remove(position);
                bucket.contacts.push(contact);

                return AddOutcome::Updated;
            }

            if bucket.contacts.len() < self.k {
                bucket.contacts.push(contact);
                self.len += 1;

                return AddOutcome::Added;
            }

            if bucket.dont_split || leaf.depth >= ID_BITS {
                let old = bucket
                    .contacts
                    .iter()
                    .take(self.number_of_nodes_to_ping)
                    .cloned()
                    .collect();

                return AddOutcome::Ping { old, new: contact };
            }

            self.split(leaf);
        }
    }

    /// Remove a contact by its kad id, returning it if it was present.
    pub fn remove(&mut self, id: &Id) -> Option<Contact> {
        let leaf = self.leaf_for(id);
        let bucket = &mut self.buckets[leaf.bucket];

        let position = bucket.contacts.iter().position(|c| &c.id == id)?;
        self.len -= 1;

        Some(bucket.contacts.remove(position))
    }

    pub fn get(&self, id: &Id) -> Option<&Contact> {
        let leaf = self.leaf_for(id);

        self.buckets[leaf.bucket]
            .contacts
            .iter()
            .find(|c| &c.id == id)
    }

    /// Up to `count` contacts, ordered by ascending distance to `target`.
    pub fn closest(&self, target: &Id, count: usize) -> Vec<Contact> {
        if count == 0 {
            return vec![];
        }

        let mut contacts: Vec<Contact> = Vec::with_capacity(count);
        let mut stack = vec![(ROOT, 0)];

        // Visit the branch matching the target first, so we collect the buckets
        // closest to the target before the ones further away.
        while let Some((index, depth)) = stack.pop() {
            if contacts.len() >= count {
                break;
            }

            match self.nodes[index] {
                Node::Leaf(bucket) => {
                    contacts.extend(self.buckets[bucket].contacts.iter().cloned());
                }
                Node::Branch { left, right } => {
                    let (near, far) = if target.bit(depth) {
                        (right, left)
                    } else {
                        (left, right)
                    };

                    stack.push((far, depth + 1));
                    stack.push((near, depth + 1));
                }
            }
        }

        contacts.sort_by_key(|c| c.id.xor(target));
        contacts.truncate(count);

        contacts
    }

    /// Remove every contact and bucket.
    pub fn clear(&mut self) {
        self.nodes = vec![Node::Leaf(0)];
        self.buckets = vec![Bucket::default()];
        self.len = 0;
    }

    // === Private Methods ===

    /// Returns the leaf covering `id`.
    fn leaf_for(&self, id: &Id) -> LeafRef {
        let mut node = ROOT;
        let mut depth = 0;

        loop {
            match self.nodes[node] {
                Node::Leaf(bucket) => return LeafRef { node, bucket, depth },
                Node::Branch { left, right } => {
                    node = if id.bit(depth) { right } else { left };
                    depth += 1;
                }
            }
        }
    }

    /// Turn a leaf into a branch, the existing bucket keeps the `0` side.
    fn split(&mut self, leaf: LeafRef) {
        let contacts = std::mem::take(&mut self.buckets[leaf.bucket].contacts);

        let (ones, zeros): (Vec<Contact>, Vec<Contact>) =
            contacts.into_iter().partition(|c| c.id.bit(leaf.depth));

        let local_bit = self.local_id.bit(leaf.depth);

        self.buckets[leaf.bucket] = Bucket {
            contacts: zeros,
            dont_split: local_bit,
        };

        let right_bucket = self.buckets.len();
        self.buckets.push(Bucket {
            contacts: ones,
            dont_split: !local_bit,
        });

        let left = self.nodes.len();
        self.nodes.push(Node::Leaf(leaf.bucket));

        let right = self.nodes.len();
        self.nodes.push(Node::Leaf(right_bucket));

        self.nodes[leaf.node] = Node::Branch { left, right };
    }
}

impl Debug for KBucketTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("KBucketTree")
            .field("local_id", &self.local_id)
            .field("k", &self.k)
            .field("buckets", &self.buckets_count())
            .field("contacts", &self.len)
            .finish()
    }
}
