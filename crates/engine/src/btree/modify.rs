//! Mutation algorithms
//!
//! Each mutation kind is a decision over the key's live value, applied
//! through [`modify_value`]. All kinds stamp the castime they are given, so
//! one call yields both the new state and its versioning metadata.

use super::{modify_value, Change, TreeContext};
use crate::mutation::{
    AddPolicy, AppendPrependKind, AppendPrependResult, DeleteResult, IncrDecrKind, IncrDecrResult,
    Mutation, MutationResult, ReplacePolicy, SetResult,
};
use crate::superblock::GotSuperblock;
use arbor_core::{Castime, Exptime, Result, StoreKey, StoredValue};
use arbor_storage::Transaction;

/// Apply one mutation under `txn` and the write-locked superblock
pub(crate) fn apply(
    tree: &TreeContext<'_>,
    txn: &Transaction<'_>,
    sb: &mut GotSuperblock,
    mutation: &Mutation,
    castime: Castime,
) -> Result<MutationResult> {
    match mutation {
        Mutation::GetCas { key } => get_cas(tree, txn, sb, key, castime).map(MutationResult::GetCas),
        Mutation::Set {
            key,
            data,
            flags,
            exptime,
            add_policy,
            replace_policy,
            return_old,
        } => {
            let request = SetRequest {
                data,
                flags: *flags,
                exptime: *exptime,
                add_policy: *add_policy,
                replace_policy: *replace_policy,
                return_old: *return_old,
            };
            let (result, old_value) = set(tree, txn, sb, key, request, castime)?;
            Ok(MutationResult::Set { result, old_value })
        }
        Mutation::IncrDecr { key, kind, amount } => {
            incr_decr(tree, txn, sb, key, *kind, *amount, castime).map(MutationResult::IncrDecr)
        }
        Mutation::AppendPrepend { key, kind, data } => {
            append_prepend(tree, txn, sb, key, *kind, data, castime).map(MutationResult::AppendPrepend)
        }
        Mutation::Delete {
            key,
            dont_put_in_delete_queue,
        } => delete(tree, txn, sb, key, *dont_put_in_delete_queue, castime).map(MutationResult::Delete),
    }
}

fn get_cas(
    tree: &TreeContext<'_>,
    txn: &Transaction<'_>,
    sb: &mut GotSuperblock,
    key: &StoreKey,
    castime: Castime,
) -> Result<Option<StoredValue>> {
    modify_value(tree, txn, sb, key, castime.timestamp, |live| match live {
        Some(value) => {
            let mut value = value.clone();
            value.stamp(castime);
            (Change::Put(value.clone()), Some(value))
        }
        None => (Change::Keep, None),
    })
}

struct SetRequest<'a> {
    data: &'a [u8],
    flags: u32,
    exptime: Exptime,
    add_policy: AddPolicy,
    replace_policy: ReplacePolicy,
    return_old: bool,
}

fn set(
    tree: &TreeContext<'_>,
    txn: &Transaction<'_>,
    sb: &mut GotSuperblock,
    key: &StoreKey,
    request: SetRequest<'_>,
    castime: Castime,
) -> Result<(SetResult, Option<StoredValue>)> {
    if request.data.len() > tree.options.max_value_size {
        return Ok((SetResult::TooLarge, None));
    }
    modify_value(tree, txn, sb, key, castime.timestamp, |live| {
        let outcome = match (live, request.replace_policy) {
            (None, ReplacePolicy::IfCasMatches(_)) if request.add_policy == AddPolicy::No => {
                SetResult::NotFound
            }
            (None, _) if request.add_policy == AddPolicy::No => SetResult::DidntAdd,
            (Some(_), ReplacePolicy::No) => SetResult::DidntReplace,
            (Some(old), ReplacePolicy::IfCasMatches(expected)) if old.cas != Some(expected) => {
                SetResult::Exists
            }
            _ => SetResult::Stored,
        };
        let old_value = live.filter(|_| request.return_old).cloned();
        if outcome != SetResult::Stored {
            return (Change::Keep, (outcome, old_value));
        }
        let value = StoredValue::new(request.data.to_vec(), request.flags, request.exptime, castime);
        (Change::Put(value), (outcome, old_value))
    })
}

/// Parse a stored payload as an unsigned decimal number
fn parse_number(data: &[u8]) -> Option<u64> {
    std::str::from_utf8(data).ok()?.trim().parse().ok()
}

fn incr_decr(
    tree: &TreeContext<'_>,
    txn: &Transaction<'_>,
    sb: &mut GotSuperblock,
    key: &StoreKey,
    kind: IncrDecrKind,
    amount: u64,
    castime: Castime,
) -> Result<IncrDecrResult> {
    modify_value(tree, txn, sb, key, castime.timestamp, |live| {
        let Some(old) = live else {
            return (Change::Keep, IncrDecrResult::NotFound);
        };
        let Some(number) = parse_number(&old.data) else {
            return (Change::Keep, IncrDecrResult::NotNumeric);
        };
        let number = match kind {
            IncrDecrKind::Incr => number.wrapping_add(amount),
            IncrDecrKind::Decr => number.saturating_sub(amount),
        };
        let mut value = old.clone();
        value.data = number.to_string().into_bytes();
        value.stamp(castime);
        (Change::Put(value), IncrDecrResult::Success(number))
    })
}

fn append_prepend(
    tree: &TreeContext<'_>,
    txn: &Transaction<'_>,
    sb: &mut GotSuperblock,
    key: &StoreKey,
    kind: AppendPrependKind,
    data: &[u8],
    castime: Castime,
) -> Result<AppendPrependResult> {
    let max = tree.options.max_value_size;
    modify_value(tree, txn, sb, key, castime.timestamp, |live| {
        let Some(old) = live else {
            return (Change::Keep, AppendPrependResult::NotFound);
        };
        if old.len() + data.len() > max {
            return (Change::Keep, AppendPrependResult::TooLarge);
        }
        let mut value = old.clone();
        match kind {
            AppendPrependKind::Append => value.data.extend_from_slice(data),
            AppendPrependKind::Prepend => {
                value.data.splice(0..0, data.iter().copied());
            }
        }
        value.stamp(castime);
        (Change::Put(value), AppendPrependResult::Success)
    })
}

fn delete(
    tree: &TreeContext<'_>,
    txn: &Transaction<'_>,
    sb: &mut GotSuperblock,
    key: &StoreKey,
    dont_put_in_delete_queue: bool,
    castime: Castime,
) -> Result<DeleteResult> {
    modify_value(tree, txn, sb, key, castime.timestamp, |live| match live {
        Some(_) => (
            Change::Remove {
                record_deletion: !dont_put_in_delete_queue,
            },
            DeleteResult::Deleted,
        ),
        None => (Change::Keep, DeleteResult::NotFound),
    })
}
