//! Backfill: stream changes newer than a timestamp to a lagging replica
//!
//! Subtrees whose recency is not newer than `since` are skipped without
//! being read. For each visited leaf:
//!
//! - if the leaf may have forgotten deletions newer than `since`, the
//!   receiver is told to drop the leaf's part of the range and then gets
//!   every live key in it;
//! - otherwise it gets the deletions and key/values newer than `since`.
//!
//! Keys are reported in ascending order and `done` is called once at the
//! end.

use super::{walk_leaves, LeafVisitor};
use crate::node::LeafNode;
use crate::superblock::GotSuperblock;
use arbor_core::{unix_now, Exptime, KeyRange, ReplTimestamp, Result, StoreKey, StoredValue};
use arbor_storage::{Access, BufLock, Transaction};
use arbor_wire::{Archive, ClusterVersion, DecodeError, ReadStream, Sink};

/// A key/value change shipped by backfill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillAtom {
    /// Key
    pub key: StoreKey,
    /// Value, including flags, expiry, CAS and write timestamp
    pub value: StoredValue,
}

impl BackfillAtom {
    /// Timestamp of the write this atom carries
    pub fn recency(&self) -> ReplTimestamp {
        self.value.timestamp
    }
}

impl Archive for BackfillAtom {
    fn serialize<S: Sink>(&self, version: ClusterVersion, sink: &mut S) {
        self.key.serialize(version, sink);
        self.value.serialize(version, sink);
    }

    fn deserialize(version: ClusterVersion, stream: &mut ReadStream<'_>) -> std::result::Result<Self, DecodeError> {
        Ok(BackfillAtom {
            key: StoreKey::deserialize(version, stream)?,
            value: StoredValue::deserialize(version, stream)?,
        })
    }
}

/// Receiver of a backfill stream
pub trait BackfillCallback {
    /// Every key in `range` must be dropped before the atoms that follow
    fn on_delete_range(&mut self, range: &KeyRange);

    /// `key` was deleted at `recency`
    fn on_deletion(&mut self, key: &StoreKey, recency: ReplTimestamp);

    /// A key/value written after `since`
    fn on_keyvalue(&mut self, atom: BackfillAtom);

    /// The stream is complete
    fn done(&mut self);
}

struct Backfiller<'a, C: ?Sized> {
    range: &'a KeyRange,
    since: ReplTimestamp,
    now: Exptime,
    callback: &'a mut C,
    leaves: usize,
}

impl<C: BackfillCallback + ?Sized> Backfiller<'_, C> {
    fn send_value(&mut self, key: StoreKey, value: StoredValue) {
        if !value.is_expired(self.now) {
            self.callback.on_keyvalue(BackfillAtom { key, value });
        }
    }
}

impl<C: BackfillCallback + ?Sized> LeafVisitor for Backfiller<'_, C> {
    fn enter(&mut self, buf: &BufLock) -> bool {
        buf.recency() > self.since
    }

    fn leaf(&mut self, _buf: &mut BufLock, leaf: LeafNode, bounds: &KeyRange) -> Result<bool> {
        self.leaves += 1;
        let clipped = bounds.intersection(self.range);
        if clipped.is_empty() {
            return Ok(true);
        }

        if leaf.deletion_horizon > self.since {
            self.callback.on_delete_range(&clipped);
            for (key, value) in leaf.entries {
                if clipped.contains(&key) {
                    self.send_value(key, value);
                }
            }
            return Ok(true);
        }

        let since = self.since;
        let mut deletions = leaf
            .deletions
            .into_iter()
            .filter(|(key, ts)| *ts > since && clipped.contains(key))
            .peekable();
        let mut entries = leaf
            .entries
            .into_iter()
            .filter(|(key, value)| value.timestamp > since && clipped.contains(key))
            .peekable();

        loop {
            let deletion_first = match (deletions.peek(), entries.peek()) {
                (Some((dk, _)), Some((ek, _))) => dk < ek,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            if deletion_first {
                if let Some((key, ts)) = deletions.next() {
                    self.callback.on_deletion(&key, ts);
                }
            } else if let Some((key, value)) = entries.next() {
                self.send_value(key, value);
            }
        }
        Ok(true)
    }
}

/// Report every change in `range` newer than `since` to `callback`
pub fn backfill<C: BackfillCallback + ?Sized>(
    txn: &Transaction<'_>,
    sb: &GotSuperblock,
    range: &KeyRange,
    since: ReplTimestamp,
    callback: &mut C,
) -> Result<()> {
    let mut backfiller = Backfiller {
        range,
        since,
        now: unix_now(),
        callback,
        leaves: 0,
    };
    walk_leaves(txn, sb, Access::Read, range, &mut backfiller)?;
    tracing::debug!(%range, %since, leaves = backfiller.leaves, "backfill complete");
    backfiller.callback.done();
    Ok(())
}
