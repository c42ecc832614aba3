//! Predicate-driven range removal
//!
//! Used to drop keys a shard no longer owns. Removals are not recorded in
//! the leaves' deletion history.

use super::{walk_leaves, LeafVisitor};
use crate::node::{LeafNode, Node};
use crate::superblock::GotSuperblock;
use arbor_core::{Error, KeyRange, Result, RightBound, StoreKey};
use arbor_storage::{Access, BufLock, Transaction};

/// Decides, key by key, whether a range erase removes it
pub trait KeyTester {
    /// True if `key` should be erased
    fn key_should_be_erased(&self, key: &StoreKey) -> bool;
}

impl<F> KeyTester for F
where
    F: Fn(&StoreKey) -> bool,
{
    fn key_should_be_erased(&self, key: &StoreKey) -> bool {
        self(key)
    }
}

/// Bounds of a range erase: `(left, right]`, either side optional
#[derive(Debug, Clone, Copy)]
pub struct EraseBounds<'k> {
    /// Keys must be strictly greater than this
    pub left_exclusive: Option<&'k StoreKey>,
    /// Keys must be less than or equal to this
    pub right_inclusive: Option<&'k StoreKey>,
}

impl EraseBounds<'_> {
    fn admits_left(&self, key: &StoreKey) -> bool {
        self.left_exclusive.map_or(true, |left| key > left)
    }

    fn admits_right(&self, key: &StoreKey) -> bool {
        self.right_inclusive.map_or(true, |right| key <= right)
    }
}

struct Eraser<'a, T: ?Sized> {
    tester: &'a T,
    bounds: EraseBounds<'a>,
    timestamp: arbor_core::ReplTimestamp,
    erased: usize,
}

impl<T: KeyTester + ?Sized> LeafVisitor for Eraser<'_, T> {
    fn leaf(&mut self, buf: &mut BufLock, mut leaf: LeafNode, _bounds: &KeyRange) -> Result<bool> {
        let before = leaf.entries.len();
        let mut past_right = false;
        leaf.entries.retain(|(key, _)| {
            if !self.bounds.admits_left(key) {
                return true;
            }
            if !self.bounds.admits_right(key) {
                past_right = true;
                return true;
            }
            !self.tester.key_should_be_erased(key)
        });
        let removed = before - leaf.entries.len();
        if removed > 0 {
            Node::Leaf(leaf).store(buf)?;
            buf.touch_recency(self.timestamp)?;
            self.erased += removed;
        }
        Ok(!past_right)
    }
}

/// Remove every key in `bounds` the tester accepts, returning how many
pub fn erase_range<T: KeyTester + ?Sized>(
    txn: &Transaction<'_>,
    sb: &mut GotSuperblock,
    tester: &T,
    bounds: EraseBounds<'_>,
) -> Result<usize> {
    if !sb.is_write_locked() {
        return Err(Error::InvalidOperation(
            "range erase requires a write-locked superblock".to_string(),
        ));
    }
    let walk_range = KeyRange::new(
        bounds.left_exclusive.cloned().unwrap_or_else(StoreKey::min),
        RightBound::Unbounded,
    );
    let mut eraser = Eraser {
        tester,
        bounds,
        timestamp: txn.timestamp(),
        erased: 0,
    };
    walk_leaves(txn, sb, Access::Write, &walk_range, &mut eraser)?;
    if eraser.erased > 0 {
        sb.touch_recency(txn.timestamp())?;
    }
    tracing::debug!(
        left_exclusive = ?bounds.left_exclusive.map(|k| k.to_string()),
        right_inclusive = ?bounds.right_inclusive.map(|k| k.to_string()),
        erased = eraser.erased,
        "erased key range"
    );
    Ok(eraser.erased)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use arbor_core::ReplTimestamp;

    fn erase(fx: &Fixture, tester: &dyn KeyTester, left: Option<&str>, right: Option<&str>) -> usize {
        let left = left.map(key_of);
        let right = right.map(key_of);
        let txn = fx.cache.begin(Access::Write, ReplTimestamp(100), None);
        let mut sb = GotSuperblock::acquire(&txn, Access::Write).unwrap();
        let bounds = EraseBounds {
            left_exclusive: left.as_ref(),
            right_inclusive: right.as_ref(),
        };
        erase_range(&txn, &mut sb, tester, bounds).unwrap()
    }

    fn abcd() -> Fixture {
        let fx = Fixture::new();
        for (i, k) in ["a", "b", "c", "d"].iter().enumerate() {
            fx.put(k, "v", i as u64 + 1);
        }
        fx
    }

    fn present(fx: &Fixture) -> Vec<&'static str> {
        ["a", "b", "c", "d"].into_iter().filter(|k| fx.get(k).is_some()).collect()
    }

    #[test]
    fn test_left_exclusive_right_inclusive() {
        let fx = abcd();
        let always = |_: &StoreKey| true;
        assert_eq!(erase(&fx, &always, Some("b"), Some("d")), 2);
        assert_eq!(present(&fx), ["a", "b"]);
    }

    #[test]
    fn test_unbounded_sides() {
        let fx = abcd();
        let always = |_: &StoreKey| true;
        assert_eq!(erase(&fx, &always, None, Some("b")), 2);
        assert_eq!(present(&fx), ["c", "d"]);
        assert_eq!(erase(&fx, &always, Some("c"), None), 1);
        assert_eq!(present(&fx), ["c"]);
    }

    #[test]
    fn test_tester_filters() {
        let fx = abcd();
        let only_c = |k: &StoreKey| k.as_bytes() == b"c";
        assert_eq!(erase(&fx, &only_c, None, None), 1);
        assert_eq!(present(&fx), ["a", "b", "d"]);
    }

    #[test]
    fn test_erase_across_leaves() {
        let fx = Fixture::new();
        for i in 0..200u64 {
            fx.put(&format!("k{:03}", i), "payload-payload", i + 1);
        }
        let always = |_: &StoreKey| true;
        assert_eq!(erase(&fx, &always, Some("k049"), Some("k149")), 100);
        assert!(fx.get("k049").is_some());
        assert!(fx.get("k050").is_none());
        assert!(fx.get("k149").is_none());
        assert!(fx.get("k150").is_some());
    }

    #[test]
    fn test_needs_write_lock() {
        let fx = abcd();
        let txn = fx.cache.begin(Access::Write, ReplTimestamp(1), None);
        let mut sb = GotSuperblock::acquire(&txn, Access::Read).unwrap();
        let always = |_: &StoreKey| true;
        let bounds = EraseBounds {
            left_exclusive: None,
            right_inclusive: None,
        };
        assert!(erase_range(&txn, &mut sb, &always, bounds).is_err());
    }
}
