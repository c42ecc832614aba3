//! Point lookup

use super::find_leaf;
use crate::superblock::GotSuperblock;
use arbor_core::{unix_now, Result, StoreKey, StoredValue};
use arbor_storage::Transaction;

/// Look up the live value stored under `key`
pub fn get(txn: &Transaction<'_>, sb: &GotSuperblock, key: &StoreKey) -> Result<Option<StoredValue>> {
    let now = unix_now();
    let value = find_leaf(txn, sb, key)?.and_then(|mut leaf| match leaf.search(key) {
        Ok(i) => Some(leaf.entries.swap_remove(i).1),
        Err(_) => None,
    });
    Ok(value.filter(|v| !v.is_expired(now)))
}
