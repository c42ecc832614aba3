//! In-memory block cache
//!
//! Blocks live in a `DashMap` keyed by [`BlockId`], each behind its own
//! `RwLock`. Transactions hand out [`BufLock`]s, owning guards on a single
//! block, so lock lifetimes follow ordinary Rust scoping.
//!
//! # Design
//!
//! - DashMap: sharded block table, lookups never contend on one lock
//! - Per-block RwLock: concurrent readers, exclusive writers
//! - Block 0 is reserved for the superblock and exists from the start
//!
//! Writes are applied in place; there is no rollback. A transaction is a
//! scope for locks and accounting.

mod transaction;

pub use transaction::{Access, BufLock, Transaction};

use crate::account::IoAccount;
use crate::config::CacheConfig;
use crate::context::ExecutionContext;
use crate::error::Result;
use arbor_core::ReplTimestamp;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifier of a block in the cache
pub type BlockId = u64;

/// Block reserved for a shard's superblock
pub const SUPERBLOCK_ID: BlockId = 0;

/// A cached block
#[derive(Debug, Clone)]
pub struct Block {
    pub(crate) data: Vec<u8>,
    pub(crate) recency: ReplTimestamp,
    pub(crate) eviction_priority: i32,
}

impl Block {
    fn zeroed(size: usize) -> Self {
        Block {
            data: vec![0; size],
            recency: ReplTimestamp::DISTANT_PAST,
            eviction_priority: 0,
        }
    }
}

/// Block cache with transactional access
pub struct Cache {
    config: CacheConfig,
    blocks: DashMap<BlockId, Arc<RwLock<Block>>>,
    next_block_id: AtomicU64,
    next_txn_id: AtomicU64,
    default_account: Arc<IoAccount>,
    home: ExecutionContext,
}

impl Cache {
    /// Create a cache
    ///
    /// Block 0 ([`SUPERBLOCK_ID`]) is allocated zero-filled.
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let blocks = DashMap::new();
        blocks.insert(
            SUPERBLOCK_ID,
            Arc::new(RwLock::new(Block::zeroed(config.block_size))),
        );
        tracing::debug!(block_size = config.block_size, "created block cache");
        Ok(Cache {
            default_account: Arc::new(IoAccount::new(config.default_priority)),
            config,
            blocks,
            next_block_id: AtomicU64::new(SUPERBLOCK_ID + 1),
            next_txn_id: AtomicU64::new(1),
            home: ExecutionContext::new("cache"),
        })
    }

    /// Cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Block size in bytes
    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    /// Number of allocated blocks (including the superblock)
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// The context cache operations must run on
    pub fn home_context(&self) -> &ExecutionContext {
        &self.home
    }

    /// Create an accounting bucket with its own I/O priority
    pub fn create_account(&self, priority: i32) -> Arc<IoAccount> {
        Arc::new(IoAccount::new(priority))
    }

    /// The account transactions use unless given another
    pub fn default_account(&self) -> &Arc<IoAccount> {
        &self.default_account
    }

    /// Open a transaction
    ///
    /// # Arguments
    ///
    /// * `access` - Read-only or read-write
    /// * `timestamp` - Causal timestamp carried by the transaction
    /// * `account` - Account to charge, or the default account
    pub fn begin(
        &self,
        access: Access,
        timestamp: ReplTimestamp,
        account: Option<&Arc<IoAccount>>,
    ) -> Transaction<'_> {
        let account = Arc::clone(account.unwrap_or(&self.default_account));
        account.charge_transaction();
        let id = self.next_txn_id.fetch_add(1, Ordering::Relaxed);
        Transaction::new(self, id, access, timestamp, account)
    }

    pub(crate) fn lookup(&self, id: BlockId) -> Option<Arc<RwLock<Block>>> {
        self.blocks.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn allocate(&self) -> (BlockId, Arc<RwLock<Block>>) {
        let id = self.next_block_id.fetch_add(1, Ordering::AcqRel);
        let block = Arc::new(RwLock::new(Block {
            data: Vec::new(),
            recency: ReplTimestamp::DISTANT_PAST,
            eviction_priority: 0,
        }));
        self.blocks.insert(id, Arc::clone(&block));
        (id, block)
    }

    pub(crate) fn release(&self, id: BlockId) {
        self.blocks.remove(&id);
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("block_size", &self.config.block_size)
            .field("block_count", &self.block_count())
            .finish()
    }
}
