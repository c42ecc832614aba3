//! Order checkpoint tests through the slice

use crate::common::*;
use arbor::prelude::*;

#[test]
fn tokens_in_program_order_get_increasing_positions() {
    let checkpoint = OrderCheckpoint::new("test");
    let source = OrderSource::new();
    let t1 = checkpoint.check_through(source.check_in());
    let t2 = checkpoint.check_through(source.check_in());
    assert!(t1.position().unwrap() < t2.position().unwrap());
    assert_eq!(t2.tag(), "test");
}

#[test]
fn every_token_driven_operation_passes_the_checkpoint() {
    let ts = TestSlice::new();
    let source = OrderSource::new();
    let castime = ts.castimes.next_castime();

    ts.slice
        .change(&Mutation::set(key("a"), "1"), castime, source.check_in())
        .unwrap();
    ts.slice.get(&key("a"), source.check_in()).unwrap();
    ts.slice
        .rget(RgetBoundMode::None, &StoreKey::min(), RgetBoundMode::None, &StoreKey::min(), source.check_in())
        .unwrap();
    let never = |_: &StoreKey| false;
    ts.slice.erase_range(&never, None, None, source.check_in()).unwrap();
    ts.slice
        .set_replication_clock(ReplTimestamp(5), source.check_in())
        .unwrap();
    ts.slice.set_last_sync(ReplTimestamp(5), source.check_in()).unwrap();

    assert_eq!(ts.slice.order_checkpoint().last_position(), 6);
    assert_eq!(ts.slice.order_checkpoint().regressions(), 0);
}

#[test]
fn out_of_order_token_is_flagged_not_refused() {
    let ts = TestSlice::new();
    let source = OrderSource::with_bucket(42);
    let early = source.check_in();
    let late = source.check_in();

    ts.slice.get(&key("a"), late).unwrap();
    let r = ts.slice.get(&key("a"), early);
    assert!(r.is_ok());
    assert_eq!(ts.slice.order_checkpoint().regressions(), 1);
}

#[test]
fn ignore_tokens_never_regress() {
    let ts = TestSlice::new();
    for _ in 0..10 {
        ts.slice.get(&key("a"), OrderToken::ignore()).unwrap();
    }
    assert_eq!(ts.slice.order_checkpoint().regressions(), 0);
    assert_eq!(ts.slice.order_checkpoint().last_position(), 10);
}

#[test]
fn independent_buckets_do_not_interfere() {
    let ts = TestSlice::new();
    let a = OrderSource::with_bucket(1);
    let b = OrderSource::with_bucket(2);
    for _ in 0..5 {
        b.check_in();
    }
    ts.slice.get(&key("k"), b.check_in()).unwrap();
    ts.slice.get(&key("k"), a.check_in()).unwrap();
    assert_eq!(ts.slice.order_checkpoint().regressions(), 0);
}
