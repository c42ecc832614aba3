//! Transactions and block locks
//!
//! A [`Transaction`] is a scoped unit of access to the cache. Every
//! [`BufLock`] acquired through it is an owning guard that releases its
//! block lock when dropped, so nothing outlives the scope that needs it.

use super::{Block, BlockId, Cache};
use crate::account::IoAccount;
use crate::error::{CacheError, Result};
use arbor_core::ReplTimestamp;
use parking_lot::{ArcRwLockReadGuard, ArcRwLockWriteGuard, RawRwLock};
use std::sync::Arc;

/// Access mode for a transaction or a block lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Shared access
    Read,
    /// Exclusive access
    Write,
}

/// A scoped, single-cache unit of access
pub struct Transaction<'c> {
    cache: &'c Cache,
    id: u64,
    access: Access,
    timestamp: ReplTimestamp,
    account: Arc<IoAccount>,
}

impl<'c> Transaction<'c> {
    pub(super) fn new(
        cache: &'c Cache,
        id: u64,
        access: Access,
        timestamp: ReplTimestamp,
        account: Arc<IoAccount>,
    ) -> Self {
        tracing::trace!(txn_id = id, ?access, %timestamp, "transaction opened");
        Transaction {
            cache,
            id,
            access,
            timestamp,
            account,
        }
    }

    /// Transaction identifier
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Access mode the transaction was opened with
    pub fn access(&self) -> Access {
        self.access
    }

    /// Causal timestamp carried by the transaction
    pub fn timestamp(&self) -> ReplTimestamp {
        self.timestamp
    }

    /// Account charged for this transaction
    pub fn account(&self) -> &Arc<IoAccount> {
        &self.account
    }

    /// The cache this transaction runs against
    pub fn cache(&self) -> &'c Cache {
        self.cache
    }

    /// Lock an existing block
    ///
    /// Blocks until the lock is granted.
    pub fn acquire(&self, id: BlockId, access: Access) -> Result<BufLock> {
        if access == Access::Write && self.access == Access::Read {
            return Err(CacheError::ReadOnlyTransaction(id));
        }
        let block = self.cache.lookup(id).ok_or(CacheError::NoSuchBlock(id))?;
        self.account.charge_acquisition();
        let guard = match access {
            Access::Read => Guard::Read(block.read_arc()),
            Access::Write => Guard::Write(block.write_arc()),
        };
        Ok(BufLock { id, guard })
    }

    /// Allocate a new, empty block, write-locked
    pub fn allocate(&self) -> Result<BufLock> {
        if self.access == Access::Read {
            return Err(CacheError::ReadOnlyTransaction(BlockId::MAX));
        }
        let (id, block) = self.cache.allocate();
        self.account.charge_acquisition();
        Ok(BufLock {
            id,
            guard: Guard::Write(block.write_arc()),
        })
    }

    /// Free a block held under a write lock
    pub fn release_block(&self, lock: BufLock) -> Result<()> {
        if !lock.is_write_locked() {
            return Err(CacheError::NotWriteLocked(lock.id));
        }
        let id = lock.id;
        drop(lock);
        self.cache.release(id);
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        tracing::trace!(txn_id = self.id, "transaction closed");
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("access", &self.access)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

enum Guard {
    Read(ArcRwLockReadGuard<RawRwLock, Block>),
    Write(ArcRwLockWriteGuard<RawRwLock, Block>),
}

/// A lock on one block
pub struct BufLock {
    id: BlockId,
    guard: Guard,
}

impl BufLock {
    /// Id of the locked block
    pub fn block_id(&self) -> BlockId {
        self.id
    }

    /// Check if the lock is exclusive
    pub fn is_write_locked(&self) -> bool {
        matches!(self.guard, Guard::Write(_))
    }

    fn block(&self) -> &Block {
        match &self.guard {
            Guard::Read(g) => &**g,
            Guard::Write(g) => &**g,
        }
    }

    fn block_mut(&mut self) -> Result<&mut Block> {
        match &mut self.guard {
            Guard::Read(_) => Err(CacheError::NotWriteLocked(self.id)),
            Guard::Write(g) => Ok(&mut **g),
        }
    }

    /// Block contents for reading
    pub fn data(&self) -> &[u8] {
        &self.block().data
    }

    /// Block contents for a major write (the whole block may change)
    pub fn data_mut(&mut self) -> Result<&mut Vec<u8>> {
        Ok(&mut self.block_mut()?.data)
    }

    /// Most recent timestamp written through this block
    pub fn recency(&self) -> ReplTimestamp {
        self.block().recency
    }

    /// Record a write at `timestamp`; recency never moves backwards
    pub fn touch_recency(&mut self, timestamp: ReplTimestamp) -> Result<()> {
        let block = self.block_mut()?;
        block.recency = block.recency.max(timestamp);
        Ok(())
    }

    /// Eviction priority hint
    pub fn eviction_priority(&self) -> i32 {
        self.block().eviction_priority
    }

    /// Set the eviction priority hint
    pub fn set_eviction_priority(&mut self, priority: i32) -> Result<()> {
        self.block_mut()?.eviction_priority = priority;
        Ok(())
    }
}

impl std::fmt::Debug for BufLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufLock")
            .field("block_id", &self.id)
            .field("write", &self.is_write_locked())
            .finish()
    }
}
