//! Order checkpoints
//!
//! An [`OrderCheckpoint`] is the gate every token-driven shard operation
//! passes before it opens a transaction. It records the caller's position
//! and stamps the token with a checkpoint position. Positions are strictly
//! increasing in the order calls pass the gate, so operations a client
//! issued in sequence keep that sequence even though their tree work runs
//! concurrently.
//!
//! The gate is a checkpoint, not a barrier: it holds its lock only long
//! enough to assign a position and never waits for earlier operations to
//! finish.

use arbor_core::OrderToken;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct CheckpointState {
    /// Highest token value seen per bucket
    last_seen: FxHashMap<u32, u64>,
    /// Last position handed out
    position: u64,
}

/// Per-shard causal ordering checkpoint
#[derive(Debug)]
pub struct OrderCheckpoint {
    tag: &'static str,
    state: Mutex<CheckpointState>,
    regressions: AtomicU64,
}

impl OrderCheckpoint {
    /// Create a checkpoint labelled `tag`
    pub fn new(tag: &'static str) -> Self {
        OrderCheckpoint {
            tag,
            state: Mutex::new(CheckpointState::default()),
            regressions: AtomicU64::new(0),
        }
    }

    /// Checkpoint label
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Record that `token` passed this gate and stamp it with a position
    ///
    /// For two calls made in program order, the first returned token has a
    /// strictly smaller position. A token whose value is not greater than
    /// the last one seen in its bucket is logged and counted as a
    /// regression; it still passes.
    pub fn check_through(&self, token: OrderToken) -> OrderToken {
        let mut state = self.state.lock();
        if !token.is_ignore() {
            match state.last_seen.get_mut(&token.bucket()) {
                Some(last) if token.value() <= *last => {
                    self.regressions.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        checkpoint = self.tag,
                        bucket = token.bucket(),
                        value = token.value(),
                        last_seen = *last,
                        "order token regressed"
                    );
                }
                Some(last) => *last = token.value(),
                None => {
                    state.last_seen.insert(token.bucket(), token.value());
                }
            }
        }
        state.position += 1;
        token.with_checkpoint(self.tag, state.position)
    }

    /// Last position handed out (0 if none)
    pub fn last_position(&self) -> u64 {
        self.state.lock().position
    }

    /// Number of tokens that arrived out of order
    pub fn regressions(&self) -> u64 {
        self.regressions.load(Ordering::Relaxed)
    }
}
