//! B+tree nodes
//!
//! Leaves hold sorted `(key, value)` entries and a bounded history of recent
//! deletions. Internal nodes hold pivots and child block ids: child `i`
//! covers keys in `[pivots[i - 1], pivots[i])`.
//!
//! Nodes are stored in blocks encoded at [`ClusterVersion::LATEST_DISK`].
//! Subtree recency lives on the block itself (see [`BufLock::recency`]).

use arbor_core::{fatal, ReplTimestamp, Result, StoreKey, StoredValue};
use arbor_storage::{BlockId, BufLock};
use arbor_wire::{
    decode_for_version, encode_for_version, encoded_size_for_version, Archive, ClusterVersion,
    DecodeError, ReadStream, Sink,
};

const LEAF_TAG: u8 = 0;
const INTERNAL_TAG: u8 = 1;

/// A leaf node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeafNode {
    /// Entries sorted by key
    pub entries: Vec<(StoreKey, StoredValue)>,
    /// Recent deletions, sorted by key
    pub deletions: Vec<(StoreKey, ReplTimestamp)>,
    /// Deletions at or before this timestamp may have been forgotten
    pub deletion_horizon: ReplTimestamp,
}

impl LeafNode {
    /// Index of `key` in the entries, or where it would be inserted
    pub fn search(&self, key: &StoreKey) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| k.cmp(key))
    }

    /// Record a deletion, forgetting the oldest beyond `max_deletions`
    pub fn record_deletion(&mut self, key: StoreKey, timestamp: ReplTimestamp, max_deletions: usize) {
        match self.deletions.binary_search_by(|(k, _)| k.cmp(&key)) {
            Ok(i) => self.deletions[i].1 = timestamp,
            Err(i) => self.deletions.insert(i, (key, timestamp)),
        }
        while self.deletions.len() > max_deletions {
            let oldest = self
                .deletions
                .iter()
                .enumerate()
                .min_by_key(|(_, (_, ts))| *ts)
                .map(|(i, _)| i);
            let Some(oldest) = oldest else { break };
            let (_, forgotten) = self.deletions.remove(oldest);
            self.deletion_horizon = self.deletion_horizon.max(forgotten);
        }
    }

    /// Drop any deletion record for `key`
    pub fn forget_deletion(&mut self, key: &StoreKey) {
        if let Ok(i) = self.deletions.binary_search_by(|(k, _)| k.cmp(key)) {
            self.deletions.remove(i);
        }
    }

    /// Move the upper half into a new leaf, returning its first key
    fn split(&mut self) -> (StoreKey, LeafNode) {
        let mid = self.entries.len() / 2;
        let right_entries = self.entries.split_off(mid);
        let pivot = right_entries[0].0.clone();
        let at = self.deletions.partition_point(|(k, _)| k < &pivot);
        let right = LeafNode {
            entries: right_entries,
            deletions: self.deletions.split_off(at),
            deletion_horizon: self.deletion_horizon,
        };
        (pivot, right)
    }
}

/// An internal node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode {
    /// Separator keys, sorted
    pub pivots: Vec<StoreKey>,
    /// Child blocks, one more than pivots
    pub children: Vec<BlockId>,
}

impl InternalNode {
    /// Index of the child whose range holds `key`
    pub fn child_index(&self, key: &StoreKey) -> usize {
        self.pivots.partition_point(|p| p <= key)
    }

    /// Insert a new child to the right of child `index`
    pub fn insert_child(&mut self, index: usize, pivot: StoreKey, child: BlockId) {
        self.pivots.insert(index, pivot);
        self.children.insert(index + 1, child);
    }

    /// Move the upper half into a new node, returning the promoted pivot
    fn split(&mut self) -> (StoreKey, InternalNode) {
        let mid = self.pivots.len() / 2;
        let mut right_pivots = self.pivots.split_off(mid);
        let promoted = right_pivots.remove(0);
        let right = InternalNode {
            pivots: right_pivots,
            children: self.children.split_off(mid + 1),
        };
        (promoted, right)
    }
}

/// A tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Leaf
    Leaf(LeafNode),
    /// Internal node
    Internal(InternalNode),
}

impl Node {
    /// Read a node out of a locked block
    ///
    /// Aborts if the block does not hold a decodable node.
    pub fn load(buf: &BufLock) -> Node {
        match decode_for_version(ClusterVersion::LATEST_DISK, buf.data()) {
            Ok(node) => node,
            Err(e) => fatal::consistency_failure(&format!(
                "undecodable node in block {}: {}",
                buf.block_id(),
                e
            )),
        }
    }

    /// Write this node into a write-locked block
    pub fn store(&self, buf: &mut BufLock) -> Result<()> {
        *buf.data_mut()? = encode_for_version(ClusterVersion::LATEST_DISK, self);
        Ok(())
    }

    /// Encoded size in bytes
    pub fn encoded_size(&self) -> usize {
        encoded_size_for_version(ClusterVersion::LATEST_DISK, self)
    }

    /// Check if the node has too much content for a block and can be split
    pub fn needs_split(&self, block_size: usize) -> bool {
        let splittable = match self {
            Node::Leaf(leaf) => leaf.entries.len() >= 2,
            Node::Internal(internal) => internal.pivots.len() >= 3,
        };
        splittable && self.encoded_size() > block_size
    }

    /// Split until every piece fits in a block
    ///
    /// Returns the leftmost piece and, in key order, each further piece with
    /// its separator. A leaf left with a single entry larger than a block is
    /// returned as one piece.
    pub fn split_to_fit(mut self, block_size: usize) -> (Node, Vec<(StoreKey, Node)>) {
        if !self.needs_split(block_size) {
            return (self, Vec::new());
        }
        let (pivot, right) = self.split();
        let (left, mut pieces) = self.split_to_fit(block_size);
        let (right, right_pieces) = right.split_to_fit(block_size);
        pieces.push((pivot, right));
        pieces.extend(right_pieces);
        (left, pieces)
    }

    /// Split in two, returning the separator and the new right sibling
    pub fn split(&mut self) -> (StoreKey, Node) {
        match self {
            Node::Leaf(leaf) => {
                let (pivot, right) = leaf.split();
                (pivot, Node::Leaf(right))
            }
            Node::Internal(internal) => {
                let (pivot, right) = internal.split();
                (pivot, Node::Internal(right))
            }
        }
    }
}

impl Archive for LeafNode {
    fn serialize<S: Sink>(&self, version: ClusterVersion, sink: &mut S) {
        self.entries.serialize(version, sink);
        self.deletions.serialize(version, sink);
        self.deletion_horizon.serialize(version, sink);
    }

    fn deserialize(version: ClusterVersion, stream: &mut ReadStream<'_>) -> std::result::Result<Self, DecodeError> {
        Ok(LeafNode {
            entries: Vec::deserialize(version, stream)?,
            deletions: Vec::deserialize(version, stream)?,
            deletion_horizon: ReplTimestamp::deserialize(version, stream)?,
        })
    }
}

impl Archive for InternalNode {
    fn serialize<S: Sink>(&self, version: ClusterVersion, sink: &mut S) {
        self.pivots.serialize(version, sink);
        self.children.serialize(version, sink);
    }

    fn deserialize(version: ClusterVersion, stream: &mut ReadStream<'_>) -> std::result::Result<Self, DecodeError> {
        let pivots: Vec<StoreKey> = Vec::deserialize(version, stream)?;
        let children: Vec<u64> = Vec::deserialize(version, stream)?;
        if children.len() != pivots.len() + 1 {
            return Err(DecodeError::LengthOutOfRange(children.len() as u64));
        }
        Ok(InternalNode { pivots, children })
    }
}

impl Archive for Node {
    fn serialize<S: Sink>(&self, version: ClusterVersion, sink: &mut S) {
        match self {
            Node::Leaf(leaf) => {
                sink.put_u8(LEAF_TAG);
                leaf.serialize(version, sink);
            }
            Node::Internal(internal) => {
                sink.put_u8(INTERNAL_TAG);
                internal.serialize(version, sink);
            }
        }
    }

    fn deserialize(version: ClusterVersion, stream: &mut ReadStream<'_>) -> std::result::Result<Self, DecodeError> {
        match stream.take_u8()? {
            LEAF_TAG => Ok(Node::Leaf(LeafNode::deserialize(version, stream)?)),
            INTERNAL_TAG => Ok(Node::Internal(InternalNode::deserialize(version, stream)?)),
            tag => Err(DecodeError::InvalidTag { what: "node", tag }),
        }
    }
}
