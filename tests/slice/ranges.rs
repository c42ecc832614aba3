//! Range read, range erase and backfill tests

use crate::common::*;
use arbor::prelude::*;

fn abcd() -> TestSlice {
    let ts = TestSlice::new();
    for k in ["a", "b", "c", "d"] {
        ts.set(k, k);
    }
    ts
}

fn present(ts: &TestSlice) -> Vec<&'static str> {
    ["a", "b", "c", "d"]
        .into_iter()
        .filter(|k| ts.get(k).is_some())
        .collect()
}

fn rget_keys(
    ts: &TestSlice,
    left_mode: RgetBoundMode,
    left: &str,
    right_mode: RgetBoundMode,
    right: &str,
) -> Vec<String> {
    ts.slice
        .rget(left_mode, &key(left), right_mode, &key(right), OrderToken::ignore())
        .unwrap()
        .map(|kv| kv.key.to_string())
        .collect()
}

// ============================================================================
// Range erase
// ============================================================================

#[test]
fn erase_excludes_left_and_includes_right() {
    let ts = abcd();
    let always = |_: &StoreKey| true;
    let erased = ts
        .slice
        .erase_range(&always, Some(&key("b")), Some(&key("d")), OrderToken::ignore())
        .unwrap();
    assert_eq!(erased, 2);
    assert_eq!(present(&ts), ["a", "b"]);
}

#[test]
fn erase_tester_sees_only_keys_in_bounds() {
    let ts = abcd();
    let seen = std::cell::RefCell::new(Vec::new());
    let record = |k: &StoreKey| {
        seen.borrow_mut().push(k.to_string());
        false
    };
    ts.slice
        .erase_range(&record, Some(&key("a")), Some(&key("c")), OrderToken::ignore())
        .unwrap();
    assert_eq!(*seen.borrow(), ["b", "c"]);
    assert_eq!(present(&ts), ["a", "b", "c", "d"]);
}

#[test]
fn erase_outside_owned_range() {
    let ts = TestSlice::small_blocks();
    for i in 0..300 {
        ts.set(&format!("user:{:04}", i), "profile");
    }
    let owned = KeyRange::new(key("user:0100"), RightBound::Exclusive(key("user:0200")));
    let not_owned = |k: &StoreKey| !owned.contains(k);
    let erased = ts
        .slice
        .erase_range(&not_owned, None, None, OrderToken::ignore())
        .unwrap();
    assert_eq!(erased, 200);
    let left: Vec<_> = ts
        .slice
        .rget(RgetBoundMode::None, &StoreKey::min(), RgetBoundMode::None, &StoreKey::min(), OrderToken::ignore())
        .unwrap()
        .map(|kv| kv.key)
        .collect();
    assert_eq!(left.len(), 100);
    assert!(left.iter().all(|k| owned.contains(k)));
}

// ============================================================================
// Range get
// ============================================================================

#[test]
fn rget_bound_modes() {
    use RgetBoundMode::*;
    let ts = abcd();
    assert_eq!(rget_keys(&ts, Open, "a", Closed, "c"), ["b", "c"]);
    assert_eq!(rget_keys(&ts, Closed, "a", Open, "c"), ["a", "b"]);
    assert_eq!(rget_keys(&ts, None, "", Open, "b"), ["a"]);
    assert_eq!(rget_keys(&ts, Closed, "c", None, ""), ["c", "d"]);
}

#[test]
fn rget_reads_leaves_as_it_advances() {
    let ts = TestSlice::small_blocks();
    for i in 0..400 {
        ts.set(&format!("k{:03}", i), "some-longer-value");
    }
    let account = ts.slice.cache().default_account();

    let before = account.acquisitions();
    let mut result = ts
        .slice
        .rget(RgetBoundMode::None, &StoreKey::min(), RgetBoundMode::None, &StoreKey::min(), OrderToken::ignore())
        .unwrap();
    assert_eq!(account.acquisitions() - before, 1, "only the superblock is locked up front");

    assert_eq!(result.next().unwrap().key.to_string(), "k000");
    let after_first_leaf = account.acquisitions() - before;
    assert!(after_first_leaf <= 5);

    assert_eq!(result.count(), 399);
    assert!(account.acquisitions() - before > 10 * after_first_leaf);
}

#[test]
fn rget_holds_its_snapshot_until_dropped() {
    let ts = abcd();
    let mut result = ts
        .slice
        .rget(RgetBoundMode::None, &StoreKey::min(), RgetBoundMode::None, &StoreKey::min(), OrderToken::ignore())
        .unwrap();
    assert_eq!(result.next().unwrap().key.to_string(), "a");
    drop(result);

    ts.set("e", "e");
    assert_eq!(rget_keys(&ts, RgetBoundMode::None, "", RgetBoundMode::None, "").len(), 5);
}

#[test]
fn rget_within_shared_transaction() {
    let ts = abcd();
    let castime = ts.castimes.next_castime();
    let (txn, mut sb) = ts.slice.begin_write(castime.timestamp).unwrap();
    ts.slice
        .change_in(&Mutation::delete(key("b")), castime, &txn, &mut sb)
        .unwrap();
    let keys: Vec<_> = ts
        .slice
        .rget_in(RgetBoundMode::None, &StoreKey::min(), RgetBoundMode::None, &StoreKey::min(), &txn, &sb)
        .unwrap()
        .map(|kv| kv.key.to_string())
        .collect();
    assert_eq!(keys, ["a", "c", "d"]);
}

// ============================================================================
// Backfill
// ============================================================================

#[derive(Default)]
struct Collected {
    delete_ranges: Vec<KeyRange>,
    deletions: Vec<(String, ReplTimestamp)>,
    values: Vec<(String, Vec<u8>)>,
    done: bool,
}

impl BackfillCallback for Collected {
    fn on_delete_range(&mut self, range: &KeyRange) {
        self.delete_ranges.push(range.clone());
    }

    fn on_deletion(&mut self, key: &StoreKey, recency: ReplTimestamp) {
        self.deletions.push((key.to_string(), recency));
    }

    fn on_keyvalue(&mut self, atom: BackfillAtom) {
        self.values.push((atom.key.to_string(), atom.value.data));
    }

    fn done(&mut self) {
        assert!(!self.done, "done called twice");
        self.done = true;
    }
}

#[test]
fn backfill_catches_up_a_replica() {
    let ts = abcd();
    let checkpoint = ts.get("d").unwrap().timestamp;
    ts.set("b", "b2");
    let delete = ts.castimes.next_castime();
    ts.slice
        .change(&Mutation::delete(key("c")), delete, OrderToken::ignore())
        .unwrap();

    let mut collected = Collected::default();
    ts.slice
        .backfill(&KeyRange::universe(), checkpoint, &mut collected, OrderToken::ignore())
        .unwrap();

    assert!(collected.done);
    assert!(collected.delete_ranges.is_empty());
    assert_eq!(collected.values, [("b".to_string(), b"b2".to_vec())]);
    assert_eq!(collected.deletions, [("c".to_string(), delete.timestamp)]);
}

#[test]
fn backfill_respects_range_and_charges_its_account() {
    let ts = TestSlice::small_blocks();
    for i in 0..200 {
        ts.set(&format!("k{:03}", i), "v");
    }
    let foreground_before = ts.slice.cache().default_account().transactions();
    let backfill_before = ts.slice.backfill_account().transactions();

    let range = KeyRange::new(key("k050"), RightBound::Exclusive(key("k060")));
    let mut collected = Collected::default();
    ts.slice
        .backfill(&range, ReplTimestamp::DISTANT_PAST, &mut collected, OrderToken::ignore())
        .unwrap();

    let keys: Vec<_> = collected.values.iter().map(|(k, _)| k.clone()).collect();
    let expected: Vec<_> = (50..60).map(|i| format!("k{:03}", i)).collect();
    assert_eq!(keys, expected);
    assert_eq!(ts.slice.backfill_account().transactions(), backfill_before + 1);
    assert_eq!(ts.slice.cache().default_account().transactions(), foreground_before);
}

#[test]
fn backfill_with_forgotten_deletions_resends_range() {
    let options = SliceOptions {
        max_leaf_deletions: 1,
        ..SliceOptions::default()
    };
    let ts = TestSlice::with_options(options);
    ts.set("a", "1");
    ts.set("b", "1");
    let since = ts.get("b").unwrap().timestamp;
    ts.apply(Mutation::delete(key("a")));
    ts.apply(Mutation::delete(key("b")));
    ts.set("c", "1");

    let mut collected = Collected::default();
    ts.slice
        .backfill(&KeyRange::universe(), since, &mut collected, OrderToken::ignore())
        .unwrap();
    assert_eq!(collected.delete_ranges.len(), 1);
    assert!(collected.deletions.is_empty());
    assert_eq!(collected.values, [("c".to_string(), b"1".to_vec())]);
}
