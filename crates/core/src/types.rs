//! Core types for the shard layer
//!
//! This module defines the fundamental types used throughout the system:
//! - [`StoreKey`]: Bounded, lexicographically ordered key
//! - [`KeyRange`]: Interval of keys owned by a shard
//! - [`ReplTimestamp`]: Logical replication timestamp
//! - [`Cas`] / [`Castime`]: Comparator value paired with its timestamp

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Maximum length of a key in bytes
pub const MAX_KEY_SIZE: usize = 250;

/// A key stored in a shard's tree
///
/// Keys are arbitrary byte strings of at most [`MAX_KEY_SIZE`] bytes,
/// ordered lexicographically by byte value. The empty key is the smallest
/// possible key.
///
/// # Examples
///
/// ```
/// use arbor_core::types::StoreKey;
///
/// let a = StoreKey::new("a").unwrap();
/// let b = StoreKey::new("b").unwrap();
/// assert!(a < b);
/// assert!(StoreKey::min() < a);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct StoreKey(Vec<u8>);

impl StoreKey {
    /// Create a key from bytes
    ///
    /// Returns `Error::InvalidKey` if the key exceeds [`MAX_KEY_SIZE`].
    pub fn new(bytes: impl AsRef<[u8]>) -> Result<Self> {
        let bytes = bytes.as_ref();
        if bytes.len() > MAX_KEY_SIZE {
            return Err(Error::InvalidKey(format!(
                "key is {} bytes, maximum is {}",
                bytes.len(),
                MAX_KEY_SIZE
            )));
        }
        Ok(StoreKey(bytes.to_vec()))
    }

    /// The smallest key (empty byte string)
    pub fn min() -> Self {
        StoreKey(Vec::new())
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Key length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if this is the empty key
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Right-hand boundary of a [`KeyRange`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RightBound {
    /// No upper limit
    Unbounded,
    /// Keys strictly less than this key
    Exclusive(StoreKey),
}

/// Half-open interval of keys `[left, right)`
///
/// The left bound is always inclusive; an "open" left side is expressed as
/// the empty key, which is below every other key. The right bound is either
/// unbounded or exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRange {
    /// Inclusive lower bound
    pub left: StoreKey,
    /// Upper bound
    pub right: RightBound,
}

impl KeyRange {
    /// Range containing every key: `[∅, ∞)`
    pub fn universe() -> Self {
        KeyRange {
            left: StoreKey::min(),
            right: RightBound::Unbounded,
        }
    }

    /// Range `[left, right)`
    pub fn new(left: StoreKey, right: RightBound) -> Self {
        KeyRange { left, right }
    }

    /// Range `[left, ∞)`
    pub fn from(left: StoreKey) -> Self {
        KeyRange {
            left,
            right: RightBound::Unbounded,
        }
    }

    /// Check if the range contains a key
    pub fn contains(&self, key: &StoreKey) -> bool {
        key >= &self.left && self.is_below_right(key)
    }

    /// Check if a key is below the right bound
    pub fn is_below_right(&self, key: &StoreKey) -> bool {
        match &self.right {
            RightBound::Unbounded => true,
            RightBound::Exclusive(right) => key < right,
        }
    }

    /// Check if the range contains no keys
    pub fn is_empty(&self) -> bool {
        match &self.right {
            RightBound::Unbounded => false,
            RightBound::Exclusive(right) => right <= &self.left,
        }
    }

    /// Intersection of two ranges (may be empty)
    pub fn intersection(&self, other: &KeyRange) -> KeyRange {
        let left = std::cmp::max(&self.left, &other.left).clone();
        let right = match (&self.right, &other.right) {
            (RightBound::Unbounded, r) | (r, RightBound::Unbounded) => r.clone(),
            (RightBound::Exclusive(a), RightBound::Exclusive(b)) => {
                RightBound::Exclusive(std::cmp::min(a, b).clone())
            }
        };
        KeyRange { left, right }
    }
}

impl Default for KeyRange {
    fn default() -> Self {
        Self::universe()
    }
}

impl std::fmt::Display for KeyRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.right {
            RightBound::Unbounded => write!(f, "[{:?}, +inf)", self.left.to_string()),
            RightBound::Exclusive(r) => {
                write!(f, "[{:?}, {:?})", self.left.to_string(), r.to_string())
            }
        }
    }
}

/// Logical replication timestamp
///
/// Timestamps order writes for replication. The replication clock stored in
/// the superblock is a watermark of these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReplTimestamp(pub u64);

impl ReplTimestamp {
    /// Earlier than every real timestamp
    pub const DISTANT_PAST: ReplTimestamp = ReplTimestamp(0);

    /// Marker for "no timestamp"
    pub const INVALID: ReplTimestamp = ReplTimestamp(u64::MAX);

    /// The following timestamp
    pub fn next(self) -> ReplTimestamp {
        ReplTimestamp(self.0.saturating_add(1))
    }

    /// Raw value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl Default for ReplTimestamp {
    fn default() -> Self {
        Self::DISTANT_PAST
    }
}

impl std::fmt::Display for ReplTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Comparator value for compare-and-swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cas(pub u64);

/// CAS value paired with the timestamp of the write that assigns it
///
/// Every mutation receives one castime so the stored value and its
/// externally visible versioning metadata are produced together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Castime {
    /// CAS to assign on a successful mutation
    pub proposed_cas: Cas,
    /// Replication timestamp to stamp on the write
    pub timestamp: ReplTimestamp,
}

impl Castime {
    /// Create a castime
    pub fn new(proposed_cas: Cas, timestamp: ReplTimestamp) -> Self {
        Castime {
            proposed_cas,
            timestamp,
        }
    }
}

/// Monotonic source of castimes
///
/// CAS values are unique per generator; timestamps never go backwards.
#[derive(Debug)]
pub struct CasGenerator {
    cas: AtomicU64,
    timestamp: AtomicU64,
}

impl CasGenerator {
    /// Create a generator starting after the given timestamp
    pub fn new(after: ReplTimestamp) -> Self {
        Self {
            cas: AtomicU64::new(0),
            timestamp: AtomicU64::new(after.0),
        }
    }

    /// Allocate the next CAS value
    #[inline]
    pub fn next_cas(&self) -> Cas {
        Cas(self.cas.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Allocate a castime with a fresh CAS and the next timestamp
    pub fn next_castime(&self) -> Castime {
        let timestamp = self.timestamp.fetch_add(1, Ordering::AcqRel) + 1;
        Castime::new(self.next_cas(), ReplTimestamp(timestamp))
    }

    /// Castime with a fresh CAS at a caller-chosen timestamp
    pub fn castime_at(&self, timestamp: ReplTimestamp) -> Castime {
        self.timestamp.fetch_max(timestamp.0, Ordering::AcqRel);
        Castime::new(self.next_cas(), timestamp)
    }
}

impl Default for CasGenerator {
    fn default() -> Self {
        Self::new(ReplTimestamp::DISTANT_PAST)
    }
}
