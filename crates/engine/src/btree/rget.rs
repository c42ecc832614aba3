//! Ordered range reads
//!
//! A range read is a cursor over the leaves: each step descends from the
//! root to the leaf holding the next unread key and buffers that leaf's
//! entries.

use super::seek_leaf;
use crate::superblock::GotSuperblock;
use arbor_core::{fatal, unix_now, Exptime, Result, RightBound, StoreKey, StoredValue};
use arbor_storage::Transaction;
use std::collections::VecDeque;

/// How one side of a range read is bounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RgetBoundMode {
    /// Exclude the bound key
    Open,
    /// Include the bound key
    Closed,
    /// No bound on this side
    None,
}

impl RgetBoundMode {
    fn admits_left(self, bound: &StoreKey, key: &StoreKey) -> bool {
        match self {
            RgetBoundMode::Open => key > bound,
            RgetBoundMode::Closed => key >= bound,
            RgetBoundMode::None => true,
        }
    }

    fn admits_right(self, bound: &StoreKey, key: &StoreKey) -> bool {
        match self {
            RgetBoundMode::Open => key < bound,
            RgetBoundMode::Closed => key <= bound,
            RgetBoundMode::None => true,
        }
    }
}

/// One key and its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyWithData {
    /// Key
    pub key: StoreKey,
    /// Stored value
    pub value: StoredValue,
}

/// Forward-ordered results of a range read
///
/// Leaves are read as the iterator advances, one root-to-leaf descent per
/// leaf. The iterator holds the transaction and superblock lock that served
/// the call until it is dropped, so every entry comes from the tree as it
/// stood when the call was made; writers to the shard wait for it.
pub struct RgetResult<'a> {
    held: Held<'a>,
    left_mode: RgetBoundMode,
    left_key: StoreKey,
    right_mode: RgetBoundMode,
    right_key: StoreKey,
    /// First key of the next leaf to read; `None` once the range is exhausted
    next_leaf: Option<StoreKey>,
    buffered: VecDeque<KeyWithData>,
    now: Exptime,
}

enum Held<'a> {
    Owned {
        sb: GotSuperblock,
        txn: Transaction<'a>,
    },
    Borrowed {
        sb: &'a GotSuperblock,
        txn: &'a Transaction<'a>,
    },
}

impl<'a> Held<'a> {
    fn parts(&self) -> (&Transaction<'a>, &GotSuperblock) {
        match self {
            Held::Owned { sb, txn } => (txn, sb),
            Held::Borrowed { sb, txn } => (*txn, *sb),
        }
    }
}

impl<'a> RgetResult<'a> {
    fn new(
        held: Held<'a>,
        left_mode: RgetBoundMode,
        left_key: &StoreKey,
        right_mode: RgetBoundMode,
        right_key: &StoreKey,
    ) -> Self {
        let first = match left_mode {
            RgetBoundMode::None => StoreKey::min(),
            RgetBoundMode::Open | RgetBoundMode::Closed => left_key.clone(),
        };
        RgetResult {
            held,
            left_mode,
            left_key: left_key.clone(),
            right_mode,
            right_key: right_key.clone(),
            next_leaf: Some(first),
            buffered: VecDeque::new(),
            now: unix_now(),
        }
    }

    /// Range read that owns its transaction and superblock lock
    pub(crate) fn owning(
        txn: Transaction<'a>,
        sb: GotSuperblock,
        left_mode: RgetBoundMode,
        left_key: &StoreKey,
        right_mode: RgetBoundMode,
        right_key: &StoreKey,
    ) -> Self {
        Self::new(Held::Owned { sb, txn }, left_mode, left_key, right_mode, right_key)
    }

    /// Read leaves until something is buffered or the range is exhausted
    fn fill(&mut self) -> Result<()> {
        while self.buffered.is_empty() {
            let Some(seek) = self.next_leaf.take() else {
                return Ok(());
            };
            let (txn, sb) = self.held.parts();
            let Some((leaf, right)) = seek_leaf(txn, sb, &seek)? else {
                return Ok(());
            };
            for (key, value) in leaf.entries {
                if !self.left_mode.admits_left(&self.left_key, &key) {
                    continue;
                }
                if !self.right_mode.admits_right(&self.right_key, &key) {
                    return Ok(());
                }
                if !value.is_expired(self.now) {
                    self.buffered.push_back(KeyWithData { key, value });
                }
            }
            if let RightBound::Exclusive(pivot) = right {
                if self.right_mode.admits_right(&self.right_key, &pivot) {
                    self.next_leaf = Some(pivot);
                }
            }
        }
        Ok(())
    }
}

impl Iterator for RgetResult<'_> {
    type Item = KeyWithData;

    fn next(&mut self) -> Option<KeyWithData> {
        if self.buffered.is_empty() && self.next_leaf.is_some() {
            let _home = self.held.parts().0.cache().home_context().enter();
            if let Err(err) = self.fill() {
                // The superblock lock is held, so the tree cannot have moved.
                fatal::consistency_failure(&format!("range read lost its place: {}", err));
            }
        }
        self.buffered.pop_front()
    }
}

impl std::iter::FusedIterator for RgetResult<'_> {}

impl std::fmt::Debug for RgetResult<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RgetResult")
            .field("txn_id", &self.held.parts().0.id())
            .field("next_leaf", &self.next_leaf)
            .field("buffered", &self.buffered.len())
            .finish()
    }
}

/// Read every live key between the two bounds, in ascending order
///
/// Nothing is read until the result is first advanced.
pub fn rget<'a>(
    txn: &'a Transaction<'a>,
    sb: &'a GotSuperblock,
    left_mode: RgetBoundMode,
    left_key: &StoreKey,
    right_mode: RgetBoundMode,
    right_key: &StoreKey,
) -> RgetResult<'a> {
    RgetResult::new(Held::Borrowed { sb, txn }, left_mode, left_key, right_mode, right_key)
}
