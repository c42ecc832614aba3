//! Core types for arbor
//!
//! This crate defines the vocabulary shared by every other crate:
//! - Keys, key ranges, replication timestamps and CAS values
//! - Stored values with flags and expiry
//! - Causal order tokens
//! - The core error type and the fatal-failure helpers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod fatal;
pub mod order;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use order::OrderToken;
pub use types::{
    Cas, CasGenerator, Castime, KeyRange, ReplTimestamp, RightBound, StoreKey, MAX_KEY_SIZE,
};
pub use value::{unix_now, Exptime, StoredValue, DEFAULT_MAX_VALUE_SIZE};
