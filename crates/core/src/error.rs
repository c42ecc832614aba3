//! Error types for the shard layer
//!
//! Only recoverable conditions are represented here. Format/version
//! violations and superblock corruption never surface as an `Error`; they
//! go through [`crate::fatal`] instead.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Key syntax invalid (for example, too long)
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Value exceeds the configured size limit
    #[error("value too large: {size} bytes (max {max})")]
    ValueTooLarge {
        /// Size of the rejected value
        size: usize,
        /// Configured maximum
        max: usize,
    },

    /// Superblock metadata does not fit in a block
    #[error("metainfo too large: {size} bytes, {available} available")]
    MetainfoTooLarge {
        /// Encoded metainfo size
        size: usize,
        /// Space available in the superblock
        available: usize,
    },

    /// Bytes could not be decoded into the requested type
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// The block cache refused an access
    #[error("storage error: {0}")]
    Storage(String),

    /// Operation not valid in the current state
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
