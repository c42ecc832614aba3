//! Superblock protocol
//!
//! The superblock is the root metadata record of a shard, stored in block
//! [`SUPERBLOCK_ID`]. Its layout is fixed and little-endian:
//!
//! ```text
//! offset  size  field
//!      0     8  magic "arbr_sb1"
//!      8     8  root block id (u64::MAX = empty tree)
//!     16     8  replication clock
//!     24     8  last sync
//!     32     4  replication master id
//!     36     4  replication slave id
//!     40     1  metainfo format version tag
//!     41     4  metainfo length n
//!     45     n  metainfo: Vec<(Vec<u8>, Vec<u8>)>, version-encoded
//!      ..       zero padding to the block size
//! ```
//!
//! The format of this header must never change; new metadata goes into the
//! metainfo list.

use arbor_core::{fatal, guarantee, Error, KeyRange, ReplTimestamp, Result};
use arbor_storage::{Access, BlockId, BufLock, Transaction, SUPERBLOCK_ID};
use arbor_wire::{decode_for_version, encode_for_version, encoded_size_for_version, ClusterVersion};
use byteorder::{ByteOrder, LittleEndian};

/// Expected value of the magic field
pub const SUPERBLOCK_MAGIC: [u8; 8] = *b"arbr_sb1";

/// Root id stored when the tree is empty
pub const NULL_BLOCK_ID: BlockId = u64::MAX;

/// Metainfo key the shard's key range is stored under
pub const KEY_RANGE_METAINFO_KEY: &[u8] = b"key_range";

const MAGIC_OFFSET: usize = 0;
const ROOT_OFFSET: usize = 8;
const REPLICATION_CLOCK_OFFSET: usize = 16;
const LAST_SYNC_OFFSET: usize = 24;
const MASTER_ID_OFFSET: usize = 32;
const SLAVE_ID_OFFSET: usize = 36;
const METAINFO_VERSION_OFFSET: usize = 40;
const METAINFO_LEN_OFFSET: usize = 41;
const METAINFO_OFFSET: usize = 45;

/// Key/value metadata list kept in the superblock
pub type Metainfo = Vec<(Vec<u8>, Vec<u8>)>;

/// A locked, validated superblock
///
/// Obtained through [`GotSuperblock::acquire`], which checks the magic. The
/// lock is released when this value is dropped.
pub struct GotSuperblock {
    buf: BufLock,
}

impl GotSuperblock {
    /// Lock the superblock within `txn`
    ///
    /// Aborts if the block does not carry the superblock magic.
    pub fn acquire(txn: &Transaction<'_>, access: Access) -> Result<Self> {
        let buf = txn.acquire(SUPERBLOCK_ID, access)?;
        let data = buf.data();
        guarantee!(
            data.len() >= METAINFO_OFFSET && data[MAGIC_OFFSET..ROOT_OFFSET] == SUPERBLOCK_MAGIC,
            "superblock magic mismatch (found {:?})",
            &data[..data.len().min(ROOT_OFFSET)]
        );
        Ok(GotSuperblock { buf })
    }

    /// Zero-fill the superblock and write a fresh header for `key_range`
    ///
    /// `buf` must be the write-locked superblock block.
    pub(crate) fn initialize(
        mut buf: BufLock,
        block_size: usize,
        key_range: &KeyRange,
    ) -> Result<Self> {
        buf.touch_recency(ReplTimestamp::DISTANT_PAST)?;
        {
            let data = buf.data_mut()?;
            data.clear();
            data.resize(block_size, 0);
            data[MAGIC_OFFSET..ROOT_OFFSET].copy_from_slice(&SUPERBLOCK_MAGIC);
        }
        let mut sb = GotSuperblock { buf };
        sb.set_root(None)?;
        sb.set_replication_clock(ReplTimestamp::DISTANT_PAST)?;
        sb.set_last_sync(ReplTimestamp::DISTANT_PAST)?;
        sb.set_replication_master_id(0)?;
        sb.set_replication_slave_id(0)?;
        let encoded = encode_for_version(ClusterVersion::LATEST_DISK, key_range);
        sb.write_metainfo(&vec![(KEY_RANGE_METAINFO_KEY.to_vec(), encoded)])?;
        Ok(sb)
    }

    /// Check if the superblock is held exclusively
    pub fn is_write_locked(&self) -> bool {
        self.buf.is_write_locked()
    }

    fn data(&self) -> &[u8] {
        self.buf.data()
    }

    fn data_mut(&mut self) -> Result<&mut [u8]> {
        Ok(self.buf.data_mut()?.as_mut_slice())
    }

    /// Root node, or `None` for an empty tree
    pub fn root(&self) -> Option<BlockId> {
        match LittleEndian::read_u64(&self.data()[ROOT_OFFSET..]) {
            NULL_BLOCK_ID => None,
            id => Some(id),
        }
    }

    pub(crate) fn set_root(&mut self, root: Option<BlockId>) -> Result<()> {
        let raw = root.unwrap_or(NULL_BLOCK_ID);
        LittleEndian::write_u64(&mut self.data_mut()?[ROOT_OFFSET..], raw);
        Ok(())
    }

    /// Replication clock watermark
    pub fn replication_clock(&self) -> ReplTimestamp {
        ReplTimestamp(LittleEndian::read_u64(&self.data()[REPLICATION_CLOCK_OFFSET..]))
    }

    /// Overwrite the replication clock
    pub fn set_replication_clock(&mut self, t: ReplTimestamp) -> Result<()> {
        LittleEndian::write_u64(&mut self.data_mut()?[REPLICATION_CLOCK_OFFSET..], t.0);
        Ok(())
    }

    /// Advance the replication clock to `t` if it is behind
    pub fn merge_replication_clock(&mut self, t: ReplTimestamp) -> Result<ReplTimestamp> {
        let merged = self.replication_clock().max(t);
        self.set_replication_clock(merged)?;
        Ok(merged)
    }

    /// Last sync timestamp
    pub fn last_sync(&self) -> ReplTimestamp {
        ReplTimestamp(LittleEndian::read_u64(&self.data()[LAST_SYNC_OFFSET..]))
    }

    /// Overwrite the last sync timestamp
    pub fn set_last_sync(&mut self, t: ReplTimestamp) -> Result<()> {
        LittleEndian::write_u64(&mut self.data_mut()?[LAST_SYNC_OFFSET..], t.0);
        Ok(())
    }

    /// Replication master id
    pub fn replication_master_id(&self) -> u32 {
        LittleEndian::read_u32(&self.data()[MASTER_ID_OFFSET..])
    }

    /// Overwrite the replication master id
    pub fn set_replication_master_id(&mut self, id: u32) -> Result<()> {
        LittleEndian::write_u32(&mut self.data_mut()?[MASTER_ID_OFFSET..], id);
        Ok(())
    }

    /// Replication slave id
    pub fn replication_slave_id(&self) -> u32 {
        LittleEndian::read_u32(&self.data()[SLAVE_ID_OFFSET..])
    }

    /// Overwrite the replication slave id
    pub fn set_replication_slave_id(&mut self, id: u32) -> Result<()> {
        LittleEndian::write_u32(&mut self.data_mut()?[SLAVE_ID_OFFSET..], id);
        Ok(())
    }

    fn metainfo_version(&self) -> ClusterVersion {
        ClusterVersion::from_tag_or_abort(self.data()[METAINFO_VERSION_OFFSET] as i8)
    }

    /// Decode the whole metainfo list
    ///
    /// Aborts if the persisted bytes do not decode.
    pub fn metainfo(&self) -> Metainfo {
        let version = self.metainfo_version();
        let data = self.data();
        let len = LittleEndian::read_u32(&data[METAINFO_LEN_OFFSET..]) as usize;
        let end = METAINFO_OFFSET.saturating_add(len);
        guarantee!(
            end <= data.len(),
            "superblock metainfo length {} overruns the block",
            len
        );
        match decode_for_version(version, &data[METAINFO_OFFSET..end]) {
            Ok(metainfo) => metainfo,
            Err(e) => fatal::consistency_failure(&format!("undecodable superblock metainfo: {}", e)),
        }
    }

    fn write_metainfo(&mut self, metainfo: &Metainfo) -> Result<()> {
        let version = ClusterVersion::LATEST_DISK;
        let size = encoded_size_for_version(version, metainfo);
        let available = self.data().len().saturating_sub(METAINFO_OFFSET);
        if size > available {
            return Err(Error::MetainfoTooLarge { size, available });
        }
        let encoded = encode_for_version(version, metainfo);
        let data = self.data_mut()?;
        data[METAINFO_VERSION_OFFSET] = version.tag() as u8;
        LittleEndian::write_u32(&mut data[METAINFO_LEN_OFFSET..], size as u32);
        data[METAINFO_OFFSET..METAINFO_OFFSET + size].copy_from_slice(&encoded);
        data[METAINFO_OFFSET + size..].fill(0);
        Ok(())
    }

    /// Look up one metainfo entry
    pub fn get_metainfo(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.metainfo()
            .into_iter()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, v)| v)
    }

    /// Insert or replace one metainfo entry
    ///
    /// Returns `Error::MetainfoTooLarge` (leaving the superblock unchanged)
    /// if the list would no longer fit in the block.
    pub fn set_metainfo(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut metainfo = self.metainfo();
        match metainfo.iter_mut().find(|(k, _)| k.as_slice() == key) {
            Some(entry) => entry.1 = value.to_vec(),
            None => metainfo.push((key.to_vec(), value.to_vec())),
        }
        self.write_metainfo(&metainfo)
    }

    /// Key range the shard owns
    pub fn key_range(&self) -> KeyRange {
        let version = self.metainfo_version();
        let Some(bytes) = self.get_metainfo(KEY_RANGE_METAINFO_KEY) else {
            fatal::consistency_failure("superblock metainfo has no key range")
        };
        match decode_for_version(version, &bytes) {
            Ok(range) => range,
            Err(e) => fatal::consistency_failure(&format!("undecodable shard key range: {}", e)),
        }
    }

    /// Raise the superblock's recency to `timestamp`
    pub(crate) fn touch_recency(&mut self, timestamp: ReplTimestamp) -> Result<()> {
        Ok(self.buf.touch_recency(timestamp)?)
    }
}

impl std::fmt::Debug for GotSuperblock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GotSuperblock")
            .field("root", &self.root())
            .field("replication_clock", &self.replication_clock())
            .field("write", &self.is_write_locked())
            .finish()
    }
}
