//! Point mutation tests through the slice

use crate::common::*;
use arbor::prelude::*;

fn stored() -> MutationResult {
    MutationResult::Set {
        result: SetResult::Stored,
        old_value: None,
    }
}

// ============================================================================
// Set / GetCas / Delete
// ============================================================================

#[test]
fn set_getcas_delete_getcas() {
    let ts = TestSlice::new();
    let c1 = Castime::new(Cas(1), ReplTimestamp(1));
    let c2 = Castime::new(Cas(2), ReplTimestamp(2));
    let c3 = Castime::new(Cas(3), ReplTimestamp(3));
    let c4 = Castime::new(Cas(4), ReplTimestamp(4));
    let slice = &ts.slice;

    let r = slice.change(&Mutation::set(key("a"), "1"), c1, OrderToken::ignore()).unwrap();
    assert_eq!(r, stored());

    let r = slice
        .change(&Mutation::GetCas { key: key("a") }, c2, OrderToken::ignore())
        .unwrap();
    let MutationResult::GetCas(Some(value)) = r else {
        panic!("expected a value, got {:?}", r);
    };
    assert_eq!(value.data, b"1");
    assert_eq!(value.cas, Some(Cas(2)));
    assert_eq!(ts.get("a").unwrap().cas, Some(Cas(2)));

    let r = slice.change(&Mutation::delete(key("a")), c3, OrderToken::ignore()).unwrap();
    assert_eq!(r, MutationResult::Delete(DeleteResult::Deleted));

    let r = slice
        .change(&Mutation::GetCas { key: key("a") }, c4, OrderToken::ignore())
        .unwrap();
    assert_eq!(r, MutationResult::GetCas(None));
}

#[test]
fn set_returns_old_value_when_asked() {
    let ts = TestSlice::new();
    ts.set("k", "first");
    let r = ts.apply(Mutation::Set {
        key: key("k"),
        data: b"second".to_vec(),
        flags: 7,
        exptime: 0,
        add_policy: AddPolicy::Yes,
        replace_policy: ReplacePolicy::Yes,
        return_old: true,
    });
    let MutationResult::Set { result, old_value } = r else {
        panic!("expected a set result");
    };
    assert_eq!(result, SetResult::Stored);
    assert_eq!(old_value.unwrap().data, b"first");
    let now = ts.get("k").unwrap();
    assert_eq!(now.data, b"second");
    assert_eq!(now.flags, 7);
}

#[test]
fn add_and_replace_policies() {
    let ts = TestSlice::new();
    let add = |data: &str| Mutation::Set {
        key: key("k"),
        data: data.as_bytes().to_vec(),
        flags: 0,
        exptime: 0,
        add_policy: AddPolicy::Yes,
        replace_policy: ReplacePolicy::No,
        return_old: false,
    };
    let replace = |data: &str| Mutation::Set {
        key: key("k"),
        data: data.as_bytes().to_vec(),
        flags: 0,
        exptime: 0,
        add_policy: AddPolicy::No,
        replace_policy: ReplacePolicy::Yes,
        return_old: false,
    };

    assert_eq!(
        ts.apply(replace("x")),
        MutationResult::Set { result: SetResult::DidntAdd, old_value: None }
    );
    assert_eq!(ts.apply(add("1")), stored());
    assert_eq!(
        ts.apply(add("2")),
        MutationResult::Set { result: SetResult::DidntReplace, old_value: None }
    );
    assert_eq!(ts.apply(replace("3")), stored());
    assert_eq!(ts.data("k").as_deref(), Some("3"));
}

#[test]
fn cas_precondition() {
    let ts = TestSlice::new();
    ts.set("k", "v");
    let cas = ts.get("k").unwrap().cas.unwrap();
    let cas_set = |cas: Cas, data: &str| Mutation::Set {
        key: key("k"),
        data: data.as_bytes().to_vec(),
        flags: 0,
        exptime: 0,
        add_policy: AddPolicy::No,
        replace_policy: ReplacePolicy::IfCasMatches(cas),
        return_old: false,
    };

    assert_eq!(
        ts.apply(cas_set(Cas(cas.0 + 100), "stale")),
        MutationResult::Set { result: SetResult::Exists, old_value: None }
    );
    assert_eq!(ts.apply(cas_set(cas, "fresh")), stored());
    assert_eq!(ts.data("k").as_deref(), Some("fresh"));
}

// ============================================================================
// Increment / decrement
// ============================================================================

#[test]
fn incr_on_non_numeric_leaves_value() {
    let ts = TestSlice::new();
    ts.set("k", "abc");
    let before = ts.get("k").unwrap();
    let r = ts.apply(Mutation::IncrDecr {
        key: key("k"),
        kind: IncrDecrKind::Incr,
        amount: 1,
    });
    assert_eq!(r, MutationResult::IncrDecr(IncrDecrResult::NotNumeric));
    assert_eq!(ts.get("k").unwrap(), before);
}

#[test]
fn decr_clamps_at_zero() {
    let ts = TestSlice::new();
    ts.set("n", "3");
    let r = ts.apply(Mutation::IncrDecr {
        key: key("n"),
        kind: IncrDecrKind::Decr,
        amount: 10,
    });
    assert_eq!(r, MutationResult::IncrDecr(IncrDecrResult::Success(0)));
    assert_eq!(ts.data("n").as_deref(), Some("0"));
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn repeated_mutations_change_state_except_delete() {
    let ts = TestSlice::new();
    ts.set("n", "1");

    let incr = Mutation::IncrDecr {
        key: key("n"),
        kind: IncrDecrKind::Incr,
        amount: 1,
    };
    ts.apply(incr.clone());
    ts.apply(incr);
    assert_eq!(ts.data("n").as_deref(), Some("3"));

    let append = Mutation::AppendPrepend {
        key: key("n"),
        kind: AppendPrependKind::Append,
        data: b"x".to_vec(),
    };
    ts.apply(append.clone());
    ts.apply(append);
    assert_eq!(ts.data("n").as_deref(), Some("3xx"));

    let set = Mutation::set(key("s"), "v");
    ts.apply(set.clone());
    let first_cas = ts.get("s").unwrap().cas;
    ts.apply(set);
    assert_ne!(ts.get("s").unwrap().cas, first_cas);

    let delete = Mutation::delete(key("n"));
    assert_eq!(ts.apply(delete.clone()), MutationResult::Delete(DeleteResult::Deleted));
    assert_eq!(ts.apply(delete), MutationResult::Delete(DeleteResult::NotFound));
}

#[test]
fn prepend_and_missing_key() {
    let ts = TestSlice::new();
    let prepend = Mutation::AppendPrepend {
        key: key("k"),
        kind: AppendPrependKind::Prepend,
        data: b">".to_vec(),
    };
    assert_eq!(
        ts.apply(prepend.clone()),
        MutationResult::AppendPrepend(AppendPrependResult::NotFound)
    );
    ts.set("k", "v");
    assert_eq!(
        ts.apply(prepend),
        MutationResult::AppendPrepend(AppendPrependResult::Success)
    );
    assert_eq!(ts.data("k").as_deref(), Some(">v"));
}

#[test]
fn writes_stamp_castime() {
    let ts = TestSlice::new();
    let castime = Castime::new(Cas(77), ReplTimestamp(500));
    ts.slice
        .change(&Mutation::set(key("k"), "v"), castime, OrderToken::ignore())
        .unwrap();
    let value = ts.get("k").unwrap();
    assert_eq!(value.cas, Some(Cas(77)));
    assert_eq!(value.timestamp, ReplTimestamp(500));
}
