//! Stored value type
//!
//! A [`StoredValue`] is what a leaf entry holds: an opaque payload with
//! memcached-style flags and expiry, plus the versioning metadata assigned
//! by the last mutation that touched it.

use crate::types::{Cas, Castime, ReplTimestamp};
use serde::{Deserialize, Serialize};

/// Unix time in seconds
pub type Exptime = u32;

/// Default maximum payload size (1 MiB)
pub const DEFAULT_MAX_VALUE_SIZE: usize = 1024 * 1024;

/// A value stored under a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredValue {
    /// Payload bytes
    pub data: Vec<u8>,
    /// Opaque client flags
    pub flags: u32,
    /// Expiry in unix seconds, 0 = never
    pub exptime: Exptime,
    /// CAS assigned by the last mutation, if any
    pub cas: Option<Cas>,
    /// Timestamp of the last write
    pub timestamp: ReplTimestamp,
}

impl StoredValue {
    /// Create a value written at `castime`
    pub fn new(data: Vec<u8>, flags: u32, exptime: Exptime, castime: Castime) -> Self {
        StoredValue {
            data,
            flags,
            exptime,
            cas: Some(castime.proposed_cas),
            timestamp: castime.timestamp,
        }
    }

    /// Check if the value has expired as of `now` (unix seconds)
    pub fn is_expired(&self, now: Exptime) -> bool {
        self.exptime != 0 && self.exptime <= now
    }

    /// Re-stamp the value with a castime
    pub fn stamp(&mut self, castime: Castime) {
        self.cas = Some(castime.proposed_cas);
        self.timestamp = castime.timestamp;
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Current unix time in seconds, as used for expiry checks
pub fn unix_now() -> Exptime {
    let secs = chrono::Utc::now().timestamp();
    Exptime::try_from(secs.max(0)).unwrap_or(Exptime::MAX)
}
