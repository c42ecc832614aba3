//! Cache errors

use crate::BlockId;
use thiserror::Error;

/// Errors from the block cache
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Block id was never allocated
    #[error("no such block: {0}")]
    NoSuchBlock(BlockId),

    /// Write access requested inside a read-only transaction
    #[error("write access to block {0} in a read-only transaction")]
    ReadOnlyTransaction(BlockId),

    /// Block data requested for writing through a read lock
    #[error("block {0} is not write-locked")]
    NotWriteLocked(BlockId),

    /// Configuration rejected
    #[error("invalid cache config: {0}")]
    InvalidConfig(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<CacheError> for arbor_core::Error {
    fn from(e: CacheError) -> Self {
        arbor_core::Error::Storage(e.to_string())
    }
}
