//! Block cache for arbor
//!
//! This crate is the cache collaborator the shard layer runs on:
//! - Cache: block table with per-block reader/writer locks
//! - Transaction: scoped read or read-write access, carrying a timestamp
//! - BufLock: owning lock on one block, released on drop
//! - IoAccount: per-priority accounting of transactions and acquisitions
//! - ExecutionContext: the cache's home context and scoped affinity to it

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod account;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;

pub use account::IoAccount;
pub use cache::{Access, Block, BlockId, BufLock, Cache, Transaction, SUPERBLOCK_ID};
pub use config::{CacheConfig, MIN_BLOCK_SIZE};
pub use context::{ContextGuard, ExecutionContext};
pub use error::CacheError;
