//! Concurrent access to one slice

use crate::common::*;
use arbor::prelude::*;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::thread;

const THREADS: usize = 8;

#[test]
fn concurrent_writers_lose_nothing() {
    let ts = Arc::new(TestSlice::small_blocks());
    let per_thread = 150;

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let ts = Arc::clone(&ts);
            thread::spawn(move || {
                let source = OrderSource::new();
                let mut ids: Vec<usize> = (0..per_thread).collect();
                ids.shuffle(&mut rand::thread_rng());
                for i in ids {
                    let k = format!("t{}:{:04}", t, i);
                    ts.slice
                        .change(
                            &Mutation::set(key(&k), k.clone()),
                            ts.castimes.next_castime(),
                            source.check_in(),
                        )
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let all: Vec<_> = ts
        .slice
        .rget(RgetBoundMode::None, &StoreKey::min(), RgetBoundMode::None, &StoreKey::min(), OrderToken::ignore())
        .unwrap()
        .collect();
    assert_eq!(all.len(), THREADS * per_thread);
    assert!(all.windows(2).all(|w| w[0].key < w[1].key));
    assert!(all.iter().all(|kv| kv.value.data == kv.key.as_bytes()));
    assert_eq!(ts.slice.order_checkpoint().regressions(), 0);
}

#[test]
fn concurrent_increments_all_land() {
    let ts = Arc::new(TestSlice::new());
    ts.set("counter", "0");
    let per_thread = 100;

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let ts = Arc::clone(&ts);
            thread::spawn(move || {
                for _ in 0..per_thread {
                    ts.apply(Mutation::IncrDecr {
                        key: key("counter"),
                        kind: IncrDecrKind::Incr,
                        amount: 1,
                    });
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let expected = (THREADS * per_thread).to_string();
    assert_eq!(ts.data("counter").as_deref(), Some(expected.as_str()));
}

#[test]
fn readers_run_alongside_writers() {
    let ts = Arc::new(TestSlice::small_blocks());
    for i in 0..100 {
        ts.set(&format!("k{:03}", i), "0");
    }

    let writer = {
        let ts = Arc::clone(&ts);
        thread::spawn(move || {
            for round in 1..=20 {
                for i in 0..100 {
                    ts.set(&format!("k{:03}", i), &round.to_string());
                }
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let ts = Arc::clone(&ts);
            thread::spawn(move || {
                for _ in 0..50 {
                    let n = ts
                        .slice
                        .rget(
                            RgetBoundMode::None,
                            &StoreKey::min(),
                            RgetBoundMode::None,
                            &StoreKey::min(),
                            OrderToken::ignore(),
                        )
                        .unwrap()
                        .count();
                    assert_eq!(n, 100);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(ts.data("k050").as_deref(), Some("20"));
}
