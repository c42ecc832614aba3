//! Create/open and superblock field tests

use crate::common::*;
use arbor::prelude::*;
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Create / open
// ============================================================================

#[test]
fn create_yields_default_superblock() {
    let ts = TestSlice::new();
    let slice = &ts.slice;

    assert_eq!(slice.get_replication_clock().unwrap(), ReplTimestamp::DISTANT_PAST);
    assert_eq!(slice.get_last_sync().unwrap(), ReplTimestamp::DISTANT_PAST);
    assert_eq!(slice.get_replication_master_id().unwrap(), 0);
    assert_eq!(slice.get_replication_slave_id().unwrap(), 0);
    assert_eq!(slice.key_range().unwrap(), KeyRange::universe());

    let (_txn, sb) = slice.begin_read().unwrap();
    assert_eq!(sb.root(), None);
}

#[test]
fn key_range_survives_reopen() {
    init_tracing();
    let cache = Arc::new(Cache::new(CacheConfig::default()).unwrap());
    let range = KeyRange::new(key("m"), RightBound::Exclusive(key("t")));
    Slice::create(&cache, &range).unwrap();

    let first = Slice::open(Arc::clone(&cache)).unwrap();
    first
        .change(
            &Mutation::set(key("n"), "v"),
            Castime::new(Cas(1), ReplTimestamp(1)),
            OrderToken::ignore(),
        )
        .unwrap();
    first.set_replication_master_id(3).unwrap();
    drop(first);

    let second = Slice::open(cache).unwrap();
    assert_eq!(second.key_range().unwrap(), range);
    assert_eq!(second.get_replication_master_id().unwrap(), 3);
    assert!(second.get(&key("n"), OrderToken::ignore()).unwrap().is_some());
}

#[test]
fn create_twice_is_rejected() {
    let cache = Cache::new(CacheConfig::default()).unwrap();
    Slice::create_universe(&cache).unwrap();
    let err = Slice::create_universe(&cache).unwrap_err();
    assert!(arbor::Error::from(err).is_constraint_violation());
}

#[test]
fn options_from_toml_apply_on_open() {
    let options = SliceOptions::from_toml_str("backfill_priority = 3\nmax_value_size = 16\n").unwrap();
    let ts = TestSlice::with_options(options);
    assert_eq!(ts.slice.backfill_account().priority(), 3);
    assert_eq!(
        ts.set("k", "this value is longer than sixteen bytes"),
        MutationResult::Set { result: SetResult::TooLarge, old_value: None }
    );
}

// ============================================================================
// Superblock fields
// ============================================================================

#[test]
fn replication_clock_never_moves_back() {
    let ts = TestSlice::new();
    let slice = &ts.slice;
    slice.set_replication_clock(ReplTimestamp(10), OrderToken::ignore()).unwrap();
    slice.set_replication_clock(ReplTimestamp(4), OrderToken::ignore()).unwrap();
    assert_eq!(slice.get_replication_clock().unwrap(), ReplTimestamp(10));
}

#[test]
fn last_sync_overwrites() {
    let ts = TestSlice::new();
    let slice = &ts.slice;
    slice.set_last_sync(ReplTimestamp(10), OrderToken::ignore()).unwrap();
    slice.set_last_sync(ReplTimestamp(4), OrderToken::ignore()).unwrap();
    assert_eq!(slice.get_last_sync().unwrap(), ReplTimestamp(4));
}

#[test]
fn metainfo_entries_are_independent_of_key_range() {
    let ts = TestSlice::new();
    let slice = &ts.slice;
    assert_eq!(slice.get_metainfo(b"owner").unwrap(), None);
    slice.set_metainfo(b"owner", b"node-7").unwrap();
    assert_eq!(slice.get_metainfo(b"owner").unwrap(), Some(b"node-7".to_vec()));
    assert_eq!(slice.key_range().unwrap(), KeyRange::universe());
}

#[test]
fn oversized_metainfo_is_rejected() {
    let ts = TestSlice::new();
    let huge = vec![0u8; 8192];
    let err = ts.slice.set_metainfo(b"blob", &huge).unwrap_err();
    assert!(matches!(err, arbor_core::Error::MetainfoTooLarge { .. }));
    assert_eq!(ts.slice.get_metainfo(b"blob").unwrap(), None);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn replication_clock_is_max_of_all_sets(clocks in prop::collection::vec(0u64..1_000_000, 1..20)) {
        let ts = TestSlice::new();
        for t in &clocks {
            ts.slice.set_replication_clock(ReplTimestamp(*t), OrderToken::ignore()).unwrap();
        }
        let max = clocks.iter().copied().max().unwrap();
        prop_assert_eq!(ts.slice.get_replication_clock().unwrap(), ReplTimestamp(max));
    }
}
