//! Unified error type for arbor.
//!
//! The member crates each report failures in their own terms. This module
//! folds them into one error for callers of the facade.

use thiserror::Error;

/// All arbor errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid key (too long)
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Constraint violation (size limits, bad options, wrong lock mode)
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Block cache failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Bytes could not be decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be loaded
    #[error("config error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for arbor operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error came from the block cache.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    /// Check if the request itself was unacceptable.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Error::InvalidKey(_) | Error::ConstraintViolation(_))
    }
}

// Convert from shard-layer errors
impl From<arbor_core::Error> for Error {
    fn from(e: arbor_core::Error) -> Self {
        use arbor_core::Error as CoreError;
        match e {
            CoreError::InvalidKey(msg) => Error::InvalidKey(msg),
            CoreError::ValueTooLarge { size, max } => {
                Error::ConstraintViolation(format!("value of {} bytes exceeds {}", size, max))
            }
            CoreError::MetainfoTooLarge { size, available } => Error::ConstraintViolation(
                format!("metainfo of {} bytes exceeds {} available", size, available),
            ),
            CoreError::SerializationError(msg) => Error::Serialization(msg),
            CoreError::Storage(msg) => Error::Storage(msg),
            CoreError::InvalidOperation(msg) => Error::ConstraintViolation(msg),
        }
    }
}

impl From<arbor_wire::DecodeError> for Error {
    fn from(e: arbor_wire::DecodeError) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<arbor_storage::CacheError> for Error {
    fn from(e: arbor_storage::CacheError) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<arbor_engine::ConfigError> for Error {
    fn from(e: arbor_engine::ConfigError) -> Self {
        match e {
            arbor_engine::ConfigError::Io(io_err) => Error::Io(io_err),
            other => Error::Config(other.to_string()),
        }
    }
}
