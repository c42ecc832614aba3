//! Tree algorithms
//!
//! Every algorithm here runs against a transaction and a superblock that
//! the caller has already locked. Writers hold the superblock write lock for
//! the whole operation, so node locks taken beneath it never contend with
//! another writer; readers hold the superblock read lock.
//!
//! - [`get`]: point lookup
//! - [`modify`]: the five mutation kinds
//! - [`rget`]: ordered range read
//! - [`erase_range`]: predicate-driven range removal
//! - [`backfill`]: timestamp-bounded scan for replica catch-up

pub mod backfill;
pub mod erase_range;
pub mod get;
pub mod modify;
pub mod rget;

use crate::config::SliceOptions;
use crate::node::{InternalNode, LeafNode, Node};
use crate::superblock::GotSuperblock;
use arbor_core::{unix_now, Error, KeyRange, ReplTimestamp, Result, RightBound, StoreKey, StoredValue};
use arbor_storage::{Access, BlockId, BufLock, Transaction};
use std::sync::atomic::{AtomicI32, Ordering};

/// What the tree algorithms need to know about the shard
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeContext<'a> {
    pub block_size: usize,
    pub options: &'a SliceOptions,
    pub root_eviction_priority: &'a AtomicI32,
}

/// Edit to apply to one key's slot in its leaf
#[derive(Debug)]
pub(crate) enum Change {
    /// Leave the leaf untouched
    Keep,
    /// Insert or overwrite the value
    Put(StoredValue),
    /// Remove the value
    Remove {
        /// Remember the deletion for backfill
        record_deletion: bool,
    },
}

/// One internal node on the way down, with the child index taken
struct PathStep {
    buf: BufLock,
    node: InternalNode,
    index: usize,
}

/// Find `key`, let `decide` inspect its live value, and apply the edit
///
/// Expired values are presented as absent. Nothing is written when the
/// decision is [`Change::Keep`].
pub(crate) fn modify_value<R>(
    tree: &TreeContext<'_>,
    txn: &Transaction<'_>,
    sb: &mut GotSuperblock,
    key: &StoreKey,
    timestamp: ReplTimestamp,
    decide: impl FnOnce(Option<&StoredValue>) -> (Change, R),
) -> Result<R> {
    if !sb.is_write_locked() {
        return Err(Error::InvalidOperation(
            "mutation requires a write-locked superblock".to_string(),
        ));
    }

    let Some(root) = sb.root() else {
        let (change, result) = decide(None);
        if let Change::Put(value) = change {
            let leaf = LeafNode {
                entries: vec![(key.clone(), value)],
                ..Default::default()
            };
            let mut buf = txn.allocate()?;
            Node::Leaf(leaf).store(&mut buf)?;
            buf.touch_recency(timestamp)?;
            buf.set_eviction_priority(tree.root_eviction_priority.load(Ordering::Relaxed))?;
            sb.set_root(Some(buf.block_id()))?;
            sb.touch_recency(timestamp)?;
            tracing::debug!(root = buf.block_id(), "created first leaf");
        }
        return Ok(result);
    };

    let mut path = Vec::new();
    let mut buf = txn.acquire(root, Access::Write)?;
    let mut leaf = loop {
        match Node::load(&buf) {
            Node::Leaf(leaf) => break leaf,
            Node::Internal(node) => {
                let index = node.child_index(key);
                let child = txn.acquire(node.children[index], Access::Write)?;
                let parent = std::mem::replace(&mut buf, child);
                path.push(PathStep {
                    buf: parent,
                    node,
                    index,
                });
            }
        }
    };

    let now = unix_now();
    let position = leaf.search(key);
    let live = match position {
        Ok(i) => Some(&leaf.entries[i].1).filter(|v| !v.is_expired(now)),
        Err(_) => None,
    };
    let (change, result) = decide(live);

    match change {
        Change::Keep => return Ok(result),
        Change::Put(value) => {
            match position {
                Ok(i) => leaf.entries[i].1 = value,
                Err(i) => leaf.entries.insert(i, (key.clone(), value)),
            }
            leaf.forget_deletion(key);
        }
        Change::Remove { record_deletion } => {
            if let Ok(i) = position {
                leaf.entries.remove(i);
                if record_deletion {
                    leaf.record_deletion(key.clone(), timestamp, tree.options.max_leaf_deletions);
                }
            }
        }
    }

    sb.touch_recency(timestamp)?;
    buf.touch_recency(timestamp)?;
    for step in path.iter_mut() {
        step.buf.touch_recency(timestamp)?;
    }
    write_back(tree, txn, sb, Node::Leaf(leaf), buf, path)?;
    Ok(result)
}

/// Store a modified node, splitting upwards while nodes overflow
///
/// A node that overflows is split as many ways as it takes for every piece
/// to fit a block; all new siblings go into the parent at once.
fn write_back(
    tree: &TreeContext<'_>,
    txn: &Transaction<'_>,
    sb: &mut GotSuperblock,
    mut node: Node,
    mut buf: BufLock,
    mut path: Vec<PathStep>,
) -> Result<()> {
    loop {
        let (first, pieces) = node.split_to_fit(tree.block_size);
        let mut siblings = Vec::with_capacity(pieces.len());
        for (pivot, piece) in pieces {
            let mut piece_buf = txn.allocate()?;
            piece.store(&mut piece_buf)?;
            piece_buf.touch_recency(buf.recency())?;
            siblings.push((pivot, piece_buf.block_id()));
        }
        first.store(&mut buf)?;

        if siblings.is_empty() {
            return Ok(());
        }
        match path.pop() {
            Some(PathStep {
                buf: parent_buf,
                node: mut parent,
                index,
            }) => {
                for (offset, (pivot, id)) in siblings.into_iter().enumerate() {
                    parent.insert_child(index + offset, pivot, id);
                }
                node = Node::Internal(parent);
                buf = parent_buf;
            }
            None => {
                let mut new_root = InternalNode {
                    pivots: Vec::with_capacity(siblings.len()),
                    children: vec![buf.block_id()],
                };
                for (pivot, id) in siblings {
                    new_root.pivots.push(pivot);
                    new_root.children.push(id);
                }
                let mut root_buf = txn.allocate()?;
                root_buf.touch_recency(buf.recency())?;
                let priority = tree.root_eviction_priority.fetch_add(1, Ordering::Relaxed) + 1;
                root_buf.set_eviction_priority(priority)?;
                sb.set_root(Some(root_buf.block_id()))?;
                tracing::debug!(
                    old_root = buf.block_id(),
                    new_root = root_buf.block_id(),
                    priority,
                    "root split"
                );
                node = Node::Internal(new_root);
                buf = root_buf;
            }
        }
    }
}

/// Read the leaf whose range holds `key`
pub(crate) fn find_leaf(
    txn: &Transaction<'_>,
    sb: &GotSuperblock,
    key: &StoreKey,
) -> Result<Option<LeafNode>> {
    Ok(seek_leaf(txn, sb, key)?.map(|(leaf, _)| leaf))
}

/// Read the leaf whose range holds `key`, with the right bound of that range
///
/// Takes one read lock per level and keeps none of them.
pub(crate) fn seek_leaf(
    txn: &Transaction<'_>,
    sb: &GotSuperblock,
    key: &StoreKey,
) -> Result<Option<(LeafNode, RightBound)>> {
    let Some(root) = sb.root() else {
        return Ok(None);
    };
    let mut right = RightBound::Unbounded;
    let mut buf = txn.acquire(root, Access::Read)?;
    loop {
        match Node::load(&buf) {
            Node::Leaf(leaf) => return Ok(Some((leaf, right))),
            Node::Internal(node) => {
                let index = node.child_index(key);
                if let Some(pivot) = node.pivots.get(index) {
                    right = RightBound::Exclusive(pivot.clone());
                }
                buf = txn.acquire(node.children[index], Access::Read)?;
            }
        }
    }
}

/// Callbacks for an in-order walk over the leaves of a key range
pub(crate) trait LeafVisitor {
    /// Return false to skip the subtree held in `buf`
    fn enter(&mut self, _buf: &BufLock) -> bool {
        true
    }

    /// Handle one leaf covering `bounds`; return false to stop the walk
    fn leaf(&mut self, buf: &mut BufLock, leaf: LeafNode, bounds: &KeyRange) -> Result<bool>;
}

/// Visit, in key order, every leaf that may hold keys of `range`
pub(crate) fn walk_leaves(
    txn: &Transaction<'_>,
    sb: &GotSuperblock,
    access: Access,
    range: &KeyRange,
    visitor: &mut impl LeafVisitor,
) -> Result<()> {
    if let Some(root) = sb.root() {
        walk_subtree(txn, root, access, KeyRange::universe(), range, visitor)?;
    }
    Ok(())
}

fn walk_subtree(
    txn: &Transaction<'_>,
    id: BlockId,
    access: Access,
    bounds: KeyRange,
    range: &KeyRange,
    visitor: &mut impl LeafVisitor,
) -> Result<bool> {
    let mut buf = txn.acquire(id, access)?;
    if !visitor.enter(&buf) {
        return Ok(true);
    }
    let node = match Node::load(&buf) {
        Node::Leaf(leaf) => return visitor.leaf(&mut buf, leaf, &bounds),
        Node::Internal(node) => node,
    };
    drop(buf);

    for (i, &child) in node.children.iter().enumerate() {
        let left = match i {
            0 => bounds.left.clone(),
            _ => node.pivots[i - 1].clone(),
        };
        let right = match node.pivots.get(i) {
            Some(pivot) => RightBound::Exclusive(pivot.clone()),
            None => bounds.right.clone(),
        };
        let child_bounds = KeyRange::new(left, right);
        if child_bounds.intersection(range).is_empty() {
            continue;
        }
        if !walk_subtree(txn, child, access, child_bounds, range, visitor)? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::superblock::GotSuperblock;
    use arbor_core::{Cas, Castime};
    use arbor_storage::{Cache, CacheConfig, SUPERBLOCK_ID};

    pub struct Fixture {
        pub cache: Cache,
        pub options: SliceOptions,
        pub priority: AtomicI32,
    }

    impl Fixture {
        pub fn new() -> Self {
            let cache = Cache::new(CacheConfig::small_blocks()).unwrap();
            {
                let txn = cache.begin(Access::Write, ReplTimestamp::DISTANT_PAST, None);
                let buf = txn.acquire(SUPERBLOCK_ID, Access::Write).unwrap();
                GotSuperblock::initialize(buf, cache.block_size(), &KeyRange::universe()).unwrap();
            }
            Fixture {
                cache,
                options: SliceOptions::default(),
                priority: AtomicI32::new(100),
            }
        }

        pub fn tree(&self) -> TreeContext<'_> {
            TreeContext {
                block_size: self.cache.block_size(),
                options: &self.options,
                root_eviction_priority: &self.priority,
            }
        }

        pub fn put(&self, key: &str, data: &str, ts: u64) {
            let txn = self.cache.begin(Access::Write, ReplTimestamp(ts), None);
            let mut sb = GotSuperblock::acquire(&txn, Access::Write).unwrap();
            let value = StoredValue::new(data.as_bytes().to_vec(), 0, 0, Castime::new(Cas(ts), ReplTimestamp(ts)));
            modify_value(&self.tree(), &txn, &mut sb, &key_of(key), ReplTimestamp(ts), |_| {
                (Change::Put(value), ())
            })
            .unwrap();
        }

        pub fn remove(&self, key: &str, ts: u64) {
            let txn = self.cache.begin(Access::Write, ReplTimestamp(ts), None);
            let mut sb = GotSuperblock::acquire(&txn, Access::Write).unwrap();
            modify_value(&self.tree(), &txn, &mut sb, &key_of(key), ReplTimestamp(ts), |v| {
                match v {
                    Some(_) => (Change::Remove { record_deletion: true }, ()),
                    None => (Change::Keep, ()),
                }
            })
            .unwrap();
        }

        pub fn get(&self, key: &str) -> Option<StoredValue> {
            let txn = self.cache.begin(Access::Read, ReplTimestamp::DISTANT_PAST, None);
            let sb = GotSuperblock::acquire(&txn, Access::Read).unwrap();
            get::get(&txn, &sb, &key_of(key)).unwrap()
        }

        pub fn root(&self) -> Option<BlockId> {
            let txn = self.cache.begin(Access::Read, ReplTimestamp::DISTANT_PAST, None);
            GotSuperblock::acquire(&txn, Access::Read).unwrap().root()
        }
    }

    pub fn key_of(s: &str) -> StoreKey {
        StoreKey::new(s).unwrap()
    }
}
