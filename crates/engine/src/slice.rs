//! The shard handle
//!
//! A [`Slice`] owns everything one partition needs between open and close:
//! the cache handle, the order checkpoints, the backfill I/O account and the
//! root eviction priority.
//!
//! Data operations come in two shapes:
//!
//! - token-driven (`get`, `change`, ...): the token passes the slice's order
//!   checkpoint, then the operation opens its own transaction and locks the
//!   superblock;
//! - transaction-supplied (`get_in`, `change_in`, ...): the caller already
//!   holds a transaction and superblock from [`Slice::begin_read`] or
//!   [`Slice::begin_write`], and has dealt with ordering itself. Use this
//!   when several operations must share one transaction.
//!
//! Every entry point runs with affinity to the cache's home context.

use crate::btree::backfill::{self, BackfillCallback};
use crate::btree::erase_range::{self, EraseBounds, KeyTester};
use crate::btree::rget::{self, RgetBoundMode, RgetResult};
use crate::btree::{get, modify, TreeContext};
use crate::config::SliceOptions;
use crate::mutation::{Mutation, MutationResult};
use crate::superblock::GotSuperblock;
use arbor_concurrency::OrderCheckpoint;
use arbor_core::{
    Castime, Error, KeyRange, OrderToken, ReplTimestamp, Result, StoreKey, StoredValue,
};
use arbor_storage::{Access, Cache, ContextGuard, IoAccount, Transaction, SUPERBLOCK_ID};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Per-partition tree handle
pub struct Slice {
    cache: Arc<Cache>,
    options: SliceOptions,
    order_checkpoint: OrderCheckpoint,
    post_begin_transaction_checkpoint: OrderCheckpoint,
    backfill_account: Arc<IoAccount>,
    root_eviction_priority: AtomicI32,
}

impl Slice {
    /// Initialize a partition's superblock for `key_range`
    ///
    /// Must run once per partition, before [`Slice::open`]. Returns
    /// `Error::InvalidOperation` if the superblock is already initialized.
    pub fn create(cache: &Cache, key_range: &KeyRange) -> Result<()> {
        let _home = cache.home_context().enter();
        let txn = cache.begin(Access::Write, ReplTimestamp::DISTANT_PAST, None);
        let buf = txn.acquire(SUPERBLOCK_ID, Access::Write)?;
        if buf.data().starts_with(&crate::superblock::SUPERBLOCK_MAGIC) {
            return Err(Error::InvalidOperation(
                "superblock is already initialized".to_string(),
            ));
        }
        GotSuperblock::initialize(buf, cache.block_size(), key_range)?;
        info!(%key_range, block_size = cache.block_size(), "created slice");
        Ok(())
    }

    /// Initialize a partition that owns every key
    pub fn create_universe(cache: &Cache) -> Result<()> {
        Self::create(cache, &KeyRange::universe())
    }

    /// Open a created partition with default options
    pub fn open(cache: Arc<Cache>) -> Result<Self> {
        Self::open_with_options(cache, SliceOptions::default())
    }

    /// Open a created partition
    ///
    /// Aborts if the superblock magic does not match. Unusable options are
    /// rejected with `Error::InvalidOperation`.
    pub fn open_with_options(cache: Arc<Cache>, options: SliceOptions) -> Result<Self> {
        options
            .validate()
            .map_err(|e| Error::InvalidOperation(e.to_string()))?;
        let key_range = {
            let _home = cache.home_context().enter();
            let txn = cache.begin(Access::Read, ReplTimestamp::DISTANT_PAST, None);
            GotSuperblock::acquire(&txn, Access::Read)?.key_range()
        };
        let backfill_account = cache.create_account(options.backfill_priority);
        info!(%key_range, ?options, "opened slice");
        Ok(Slice {
            root_eviction_priority: AtomicI32::new(options.initial_root_eviction_priority),
            cache,
            options,
            order_checkpoint: OrderCheckpoint::new("slice"),
            post_begin_transaction_checkpoint: OrderCheckpoint::new("post"),
            backfill_account,
        })
    }

    /// The cache this slice runs on
    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// Options the slice was opened with
    pub fn options(&self) -> &SliceOptions {
        &self.options
    }

    /// Account backfill transactions are charged to
    pub fn backfill_account(&self) -> &Arc<IoAccount> {
        &self.backfill_account
    }

    /// Eviction priority given to the current root
    pub fn root_eviction_priority(&self) -> i32 {
        self.root_eviction_priority.load(Ordering::Relaxed)
    }

    /// Checkpoint every token-driven operation passes first
    pub fn order_checkpoint(&self) -> &OrderCheckpoint {
        &self.order_checkpoint
    }

    fn home(&self) -> ContextGuard {
        self.cache.home_context().enter()
    }

    fn tree(&self) -> TreeContext<'_> {
        TreeContext {
            block_size: self.cache.block_size(),
            options: &self.options,
            root_eviction_priority: &self.root_eviction_priority,
        }
    }

    fn begin(
        &self,
        access: Access,
        timestamp: ReplTimestamp,
        account: Option<&Arc<IoAccount>>,
    ) -> Result<(Transaction<'_>, GotSuperblock)> {
        let txn = self.cache.begin(access, timestamp, account);
        let sb = GotSuperblock::acquire(&txn, access)?;
        Ok((txn, sb))
    }

    /// Pass both checkpoints around opening the transaction
    fn begin_ordered(
        &self,
        token: OrderToken,
        access: Access,
        timestamp: ReplTimestamp,
        account: Option<&Arc<IoAccount>>,
    ) -> Result<(Transaction<'_>, GotSuperblock)> {
        let token = self.order_checkpoint.check_through(token);
        let opened = self.begin(access, timestamp, account)?;
        let token = self.post_begin_transaction_checkpoint.check_through(token);
        trace!(%token, txn_id = opened.0.id(), "transaction ordered");
        Ok(opened)
    }

    /// Open a read transaction and lock the superblock for reading
    pub fn begin_read(&self) -> Result<(Transaction<'_>, GotSuperblock)> {
        let _home = self.home();
        self.begin(Access::Read, ReplTimestamp::DISTANT_PAST, None)
    }

    /// Open a write transaction at `timestamp` and lock the superblock exclusively
    pub fn begin_write(&self, timestamp: ReplTimestamp) -> Result<(Transaction<'_>, GotSuperblock)> {
        let _home = self.home();
        self.begin(Access::Write, timestamp, None)
    }

    /// Look up a key
    pub fn get(&self, key: &StoreKey, token: OrderToken) -> Result<Option<StoredValue>> {
        let _home = self.home();
        let (txn, sb) = self.begin_ordered(token, Access::Read, ReplTimestamp::DISTANT_PAST, None)?;
        get::get(&txn, &sb, key)
    }

    /// Look up a key within a caller-held transaction
    pub fn get_in(
        &self,
        key: &StoreKey,
        txn: &Transaction<'_>,
        sb: &GotSuperblock,
    ) -> Result<Option<StoredValue>> {
        let _home = self.home();
        get::get(txn, sb, key)
    }

    /// Read a key range in ascending order
    ///
    /// The result is lazy and keeps the superblock read-locked until it is
    /// dropped. Writes to this slice from the same thread must wait until
    /// then.
    pub fn rget(
        &self,
        left_mode: RgetBoundMode,
        left_key: &StoreKey,
        right_mode: RgetBoundMode,
        right_key: &StoreKey,
        token: OrderToken,
    ) -> Result<RgetResult<'_>> {
        let _home = self.home();
        let (txn, sb) = self.begin_ordered(token, Access::Read, ReplTimestamp::DISTANT_PAST, None)?;
        Ok(RgetResult::owning(txn, sb, left_mode, left_key, right_mode, right_key))
    }

    /// Read a key range within a caller-held transaction
    pub fn rget_in<'a>(
        &self,
        left_mode: RgetBoundMode,
        left_key: &StoreKey,
        right_mode: RgetBoundMode,
        right_key: &StoreKey,
        txn: &'a Transaction<'_>,
        sb: &'a GotSuperblock,
    ) -> Result<RgetResult<'a>> {
        let _home = self.home();
        Ok(rget::rget(txn, sb, left_mode, left_key, right_mode, right_key))
    }

    /// Apply a mutation, stamping `castime` on whatever it writes
    pub fn change(
        &self,
        mutation: &Mutation,
        castime: Castime,
        token: OrderToken,
    ) -> Result<MutationResult> {
        let _home = self.home();
        let (txn, mut sb) = self.begin_ordered(token, Access::Write, castime.timestamp, None)?;
        self.apply(mutation, castime, &txn, &mut sb)
    }

    /// Apply a mutation within a caller-held write transaction
    ///
    /// The superblock must be write-locked.
    pub fn change_in(
        &self,
        mutation: &Mutation,
        castime: Castime,
        txn: &Transaction<'_>,
        sb: &mut GotSuperblock,
    ) -> Result<MutationResult> {
        let _home = self.home();
        self.apply(mutation, castime, txn, sb)
    }

    fn apply(
        &self,
        mutation: &Mutation,
        castime: Castime,
        txn: &Transaction<'_>,
        sb: &mut GotSuperblock,
    ) -> Result<MutationResult> {
        let result = modify::apply(&self.tree(), txn, sb, mutation, castime)?;
        trace!(
            kind = mutation.kind_name(),
            key = %mutation.key(),
            timestamp = %castime.timestamp,
            ?result,
            "applied mutation"
        );
        Ok(result)
    }

    /// Erase keys in `(left_key_exclusive, right_key_inclusive]` the tester accepts
    ///
    /// A `None` bound leaves that side open. Returns the number of keys erased.
    pub fn erase_range<T: KeyTester + ?Sized>(
        &self,
        tester: &T,
        left_key_exclusive: Option<&StoreKey>,
        right_key_inclusive: Option<&StoreKey>,
        token: OrderToken,
    ) -> Result<usize> {
        let _home = self.home();
        let (txn, mut sb) = self.begin_ordered(token, Access::Write, ReplTimestamp::DISTANT_PAST, None)?;
        let bounds = EraseBounds {
            left_exclusive: left_key_exclusive,
            right_inclusive: right_key_inclusive,
        };
        erase_range::erase_range(&txn, &mut sb, tester, bounds)
    }

    /// Erase a key range within a caller-held write transaction
    pub fn erase_range_in<T: KeyTester + ?Sized>(
        &self,
        tester: &T,
        left_key_exclusive: Option<&StoreKey>,
        right_key_inclusive: Option<&StoreKey>,
        txn: &Transaction<'_>,
        sb: &mut GotSuperblock,
    ) -> Result<usize> {
        let _home = self.home();
        let bounds = EraseBounds {
            left_exclusive: left_key_exclusive,
            right_inclusive: right_key_inclusive,
        };
        erase_range::erase_range(txn, sb, tester, bounds)
    }

    /// Stream changes in `range` newer than `since` to `callback`
    ///
    /// Runs under the slice's backfill account.
    pub fn backfill<C: BackfillCallback + ?Sized>(
        &self,
        range: &KeyRange,
        since: ReplTimestamp,
        callback: &mut C,
        token: OrderToken,
    ) -> Result<()> {
        let _home = self.home();
        let (txn, sb) = self.begin_ordered(
            token,
            Access::Read,
            ReplTimestamp::DISTANT_PAST,
            Some(&self.backfill_account),
        )?;
        debug!(%range, %since, "starting backfill");
        backfill::backfill(&txn, &sb, range, since, callback)
    }

    /// Backfill within a caller-held transaction
    pub fn backfill_in<C: BackfillCallback + ?Sized>(
        &self,
        range: &KeyRange,
        since: ReplTimestamp,
        callback: &mut C,
        txn: &Transaction<'_>,
        sb: &GotSuperblock,
    ) -> Result<()> {
        let _home = self.home();
        backfill::backfill(txn, sb, range, since, callback)
    }

    fn read_superblock<R>(&self, f: impl FnOnce(&GotSuperblock) -> R) -> Result<R> {
        let _home = self.home();
        let (_txn, sb) = self.begin(Access::Read, ReplTimestamp::DISTANT_PAST, None)?;
        Ok(f(&sb))
    }

    fn write_superblock<R>(&self, f: impl FnOnce(&mut GotSuperblock) -> Result<R>) -> Result<R> {
        let _home = self.home();
        let (_txn, mut sb) = self.begin(Access::Write, ReplTimestamp::DISTANT_PAST, None)?;
        f(&mut sb)
    }

    /// Advance the replication clock to `t`; it never moves backwards
    pub fn set_replication_clock(&self, t: ReplTimestamp, token: OrderToken) -> Result<()> {
        let token = self.order_checkpoint.check_through(token);
        let merged = self.write_superblock(|sb| sb.merge_replication_clock(t))?;
        debug!(requested = %t, clock = %merged, %token, "set replication clock");
        Ok(())
    }

    /// Current replication clock
    pub fn get_replication_clock(&self) -> Result<ReplTimestamp> {
        self.read_superblock(GotSuperblock::replication_clock)
    }

    /// Record the last sync timestamp
    pub fn set_last_sync(&self, t: ReplTimestamp, token: OrderToken) -> Result<()> {
        self.order_checkpoint.check_through(token);
        self.write_superblock(|sb| sb.set_last_sync(t))
    }

    /// Last sync timestamp
    pub fn get_last_sync(&self) -> Result<ReplTimestamp> {
        self.read_superblock(GotSuperblock::last_sync)
    }

    /// Record the replication master id
    pub fn set_replication_master_id(&self, id: u32) -> Result<()> {
        self.write_superblock(|sb| sb.set_replication_master_id(id))
    }

    /// Replication master id
    pub fn get_replication_master_id(&self) -> Result<u32> {
        self.read_superblock(GotSuperblock::replication_master_id)
    }

    /// Record the replication slave id
    pub fn set_replication_slave_id(&self, id: u32) -> Result<()> {
        self.write_superblock(|sb| sb.set_replication_slave_id(id))
    }

    /// Replication slave id
    pub fn get_replication_slave_id(&self) -> Result<u32> {
        self.read_superblock(GotSuperblock::replication_slave_id)
    }

    /// Read one superblock metainfo entry
    pub fn get_metainfo(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.read_superblock(|sb| sb.get_metainfo(key))
    }

    /// Insert or replace one superblock metainfo entry
    pub fn set_metainfo(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write_superblock(|sb| sb.set_metainfo(key, value))
    }

    /// Key range this slice owns
    pub fn key_range(&self) -> Result<KeyRange> {
        self.read_superblock(GotSuperblock::key_range)
    }
}

impl std::fmt::Debug for Slice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slice")
            .field("cache", &self.cache)
            .field("options", &self.options)
            .field("root_eviction_priority", &self.root_eviction_priority())
            .finish()
    }
}
