//! I/O priority accounts
//!
//! Transactions are charged to an account. Bulk work such as backfill gets
//! its own low-priority account so it is budgeted separately from
//! foreground traffic.

use std::sync::atomic::{AtomicU64, Ordering};

/// Accounting bucket for block acquisitions
#[derive(Debug)]
pub struct IoAccount {
    priority: i32,
    transactions: AtomicU64,
    acquisitions: AtomicU64,
}

impl IoAccount {
    /// Create an account with the given priority
    pub fn new(priority: i32) -> Self {
        IoAccount {
            priority,
            transactions: AtomicU64::new(0),
            acquisitions: AtomicU64::new(0),
        }
    }

    /// I/O priority (higher is more urgent)
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Transactions opened against this account
    pub fn transactions(&self) -> u64 {
        self.transactions.load(Ordering::Relaxed)
    }

    /// Block locks acquired through this account
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn charge_transaction(&self) {
        self.transactions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn charge_acquisition(&self) {
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
    }
}
