//! Order token sources
//!
//! Each client of a shard draws tokens from its own [`OrderSource`]. Tokens
//! from one source carry one bucket and strictly increasing values.

use arbor_core::OrderToken;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

static NEXT_BUCKET: AtomicU32 = AtomicU32::new(0);

/// Issues order tokens for one bucket
#[derive(Debug)]
pub struct OrderSource {
    bucket: u32,
    counter: AtomicU64,
}

impl OrderSource {
    /// Create a source with a fresh bucket
    pub fn new() -> Self {
        Self::with_bucket(NEXT_BUCKET.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a source for a caller-chosen bucket
    pub fn with_bucket(bucket: u32) -> Self {
        OrderSource {
            bucket,
            counter: AtomicU64::new(0),
        }
    }

    /// Bucket this source issues tokens for
    pub fn bucket(&self) -> u32 {
        self.bucket
    }

    /// Issue the next token
    pub fn check_in(&self) -> OrderToken {
        let value = self.counter.fetch_add(1, Ordering::AcqRel) + 1;
        OrderToken::new(self.bucket, value)
    }
}

impl Default for OrderSource {
    fn default() -> Self {
        Self::new()
    }
}
