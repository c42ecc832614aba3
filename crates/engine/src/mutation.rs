//! Mutations and their results
//!
//! [`Mutation`] is the closed set of write operations a shard accepts and
//! [`MutationResult`] mirrors it variant for variant. Both have a versioned
//! encoding so they can cross the wire between cluster members.

use arbor_core::{Cas, Exptime, StoreKey, StoredValue};
use arbor_wire::{Archive, ClusterVersion, DecodeError, ReadStream, Sink};

/// Whether a set may create a key that does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddPolicy {
    /// Create the key if absent
    Yes,
    /// Fail if absent
    No,
}

/// Whether a set may overwrite a key that exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacePolicy {
    /// Overwrite unconditionally
    Yes,
    /// Fail if present
    No,
    /// Overwrite only if the stored CAS matches
    IfCasMatches(Cas),
}

/// Direction of a numeric update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrDecrKind {
    /// Add, wrapping at 2^64
    Incr,
    /// Subtract, clamping at zero
    Decr,
}

/// Side of a concatenation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendPrependKind {
    /// Add bytes after the existing value
    Append,
    /// Add bytes before the existing value
    Prepend,
}

/// A write operation against one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Read a value and give it the castime's CAS
    GetCas {
        /// Target key
        key: StoreKey,
    },
    /// Store a value subject to add/replace policy
    Set {
        /// Target key
        key: StoreKey,
        /// Payload
        data: Vec<u8>,
        /// Client flags
        flags: u32,
        /// Expiry (unix seconds, 0 = never)
        exptime: Exptime,
        /// Behaviour when the key is absent
        add_policy: AddPolicy,
        /// Behaviour when the key is present
        replace_policy: ReplacePolicy,
        /// Return the overwritten value
        return_old: bool,
    },
    /// Apply a numeric delta to a decimal value
    IncrDecr {
        /// Target key
        key: StoreKey,
        /// Direction
        kind: IncrDecrKind,
        /// Delta
        amount: u64,
    },
    /// Concatenate bytes onto an existing value
    AppendPrepend {
        /// Target key
        key: StoreKey,
        /// Side
        kind: AppendPrependKind,
        /// Bytes to add
        data: Vec<u8>,
    },
    /// Remove a key
    Delete {
        /// Target key
        key: StoreKey,
        /// Skip recording the deletion for replication
        dont_put_in_delete_queue: bool,
    },
}

impl Mutation {
    /// Key the mutation targets
    pub fn key(&self) -> &StoreKey {
        match self {
            Mutation::GetCas { key }
            | Mutation::Set { key, .. }
            | Mutation::IncrDecr { key, .. }
            | Mutation::AppendPrepend { key, .. }
            | Mutation::Delete { key, .. } => key,
        }
    }

    /// Short name of the mutation kind (for logs)
    pub fn kind_name(&self) -> &'static str {
        match self {
            Mutation::GetCas { .. } => "get_cas",
            Mutation::Set { .. } => "set",
            Mutation::IncrDecr { .. } => "incr_decr",
            Mutation::AppendPrepend { .. } => "append_prepend",
            Mutation::Delete { .. } => "delete",
        }
    }

    /// Plain `set`: create or overwrite
    pub fn set(key: StoreKey, data: impl Into<Vec<u8>>) -> Self {
        Mutation::Set {
            key,
            data: data.into(),
            flags: 0,
            exptime: 0,
            add_policy: AddPolicy::Yes,
            replace_policy: ReplacePolicy::Yes,
            return_old: false,
        }
    }

    /// Plain `delete`, recorded for replication
    pub fn delete(key: StoreKey) -> Self {
        Mutation::Delete {
            key,
            dont_put_in_delete_queue: false,
        }
    }
}

/// Outcome of a set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetResult {
    /// Value stored
    Stored,
    /// Key absent and adding not allowed
    DidntAdd,
    /// Key present and replacing not allowed
    DidntReplace,
    /// Key present but its CAS did not match
    Exists,
    /// CAS given but key absent
    NotFound,
    /// Payload over the size limit
    TooLarge,
}

/// Outcome of an increment or decrement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrDecrResult {
    /// New numeric value
    Success(u64),
    /// Key absent
    NotFound,
    /// Stored value is not a decimal number
    NotNumeric,
}

/// Outcome of an append or prepend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendPrependResult {
    /// Bytes added
    Success,
    /// Key absent
    NotFound,
    /// Result would exceed the size limit
    TooLarge,
}

/// Outcome of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteResult {
    /// Key removed
    Deleted,
    /// Key absent
    NotFound,
}

/// Result of applying a [`Mutation`], one variant per mutation kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationResult {
    /// The value after receiving its new CAS, if the key was present
    GetCas(Option<StoredValue>),
    /// Set outcome plus the overwritten value when requested
    Set {
        /// Outcome
        result: SetResult,
        /// Previous value (only when `return_old` was set and a value existed)
        old_value: Option<StoredValue>,
    },
    /// Increment/decrement outcome
    IncrDecr(IncrDecrResult),
    /// Append/prepend outcome
    AppendPrepend(AppendPrependResult),
    /// Delete outcome
    Delete(DeleteResult),
}

macro_rules! unit_enum_archive {
    ($ty:ident, $what:literal, { $($variant:ident = $tag:literal),+ $(,)? }) => {
        impl Archive for $ty {
            fn serialize<S: Sink>(&self, _version: ClusterVersion, sink: &mut S) {
                sink.put_u8(match self {
                    $($ty::$variant => $tag,)+
                });
            }

            fn deserialize(
                _version: ClusterVersion,
                stream: &mut ReadStream<'_>,
            ) -> Result<Self, DecodeError> {
                match stream.take_u8()? {
                    $($tag => Ok($ty::$variant),)+
                    tag => Err(DecodeError::InvalidTag { what: $what, tag }),
                }
            }
        }
    };
}

unit_enum_archive!(AddPolicy, "add_policy", { Yes = 0, No = 1 });
unit_enum_archive!(IncrDecrKind, "incr_decr_kind", { Incr = 0, Decr = 1 });
unit_enum_archive!(AppendPrependKind, "append_prepend_kind", { Append = 0, Prepend = 1 });
unit_enum_archive!(SetResult, "set_result", {
    Stored = 0,
    DidntAdd = 1,
    DidntReplace = 2,
    Exists = 3,
    NotFound = 4,
    TooLarge = 5,
});
unit_enum_archive!(AppendPrependResult, "append_prepend_result", {
    Success = 0,
    NotFound = 1,
    TooLarge = 2,
});
unit_enum_archive!(DeleteResult, "delete_result", { Deleted = 0, NotFound = 1 });

impl Archive for ReplacePolicy {
    fn serialize<S: Sink>(&self, version: ClusterVersion, sink: &mut S) {
        match self {
            ReplacePolicy::Yes => sink.put_u8(0),
            ReplacePolicy::No => sink.put_u8(1),
            ReplacePolicy::IfCasMatches(cas) => {
                sink.put_u8(2);
                cas.serialize(version, sink);
            }
        }
    }

    fn deserialize(version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        match stream.take_u8()? {
            0 => Ok(ReplacePolicy::Yes),
            1 => Ok(ReplacePolicy::No),
            2 => Ok(ReplacePolicy::IfCasMatches(Cas::deserialize(version, stream)?)),
            tag => Err(DecodeError::InvalidTag { what: "replace_policy", tag }),
        }
    }
}

impl Archive for IncrDecrResult {
    fn serialize<S: Sink>(&self, version: ClusterVersion, sink: &mut S) {
        match self {
            IncrDecrResult::Success(n) => {
                sink.put_u8(0);
                n.serialize(version, sink);
            }
            IncrDecrResult::NotFound => sink.put_u8(1),
            IncrDecrResult::NotNumeric => sink.put_u8(2),
        }
    }

    fn deserialize(version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        match stream.take_u8()? {
            0 => Ok(IncrDecrResult::Success(u64::deserialize(version, stream)?)),
            1 => Ok(IncrDecrResult::NotFound),
            2 => Ok(IncrDecrResult::NotNumeric),
            tag => Err(DecodeError::InvalidTag { what: "incr_decr_result", tag }),
        }
    }
}

impl Archive for Mutation {
    fn serialize<S: Sink>(&self, version: ClusterVersion, sink: &mut S) {
        match self {
            Mutation::GetCas { key } => {
                sink.put_u8(0);
                key.serialize(version, sink);
            }
            Mutation::Set {
                key,
                data,
                flags,
                exptime,
                add_policy,
                replace_policy,
                return_old,
            } => {
                sink.put_u8(1);
                key.serialize(version, sink);
                sink.put_bytes(version, data);
                flags.serialize(version, sink);
                exptime.serialize(version, sink);
                add_policy.serialize(version, sink);
                replace_policy.serialize(version, sink);
                return_old.serialize(version, sink);
            }
            Mutation::IncrDecr { key, kind, amount } => {
                sink.put_u8(2);
                key.serialize(version, sink);
                kind.serialize(version, sink);
                amount.serialize(version, sink);
            }
            Mutation::AppendPrepend { key, kind, data } => {
                sink.put_u8(3);
                key.serialize(version, sink);
                kind.serialize(version, sink);
                sink.put_bytes(version, data);
            }
            Mutation::Delete {
                key,
                dont_put_in_delete_queue,
            } => {
                sink.put_u8(4);
                key.serialize(version, sink);
                dont_put_in_delete_queue.serialize(version, sink);
            }
        }
    }

    fn deserialize(version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        let tag = stream.take_u8()?;
        let key = StoreKey::deserialize(version, stream)?;
        match tag {
            0 => Ok(Mutation::GetCas { key }),
            1 => Ok(Mutation::Set {
                key,
                data: stream.take_bytes(version)?.to_vec(),
                flags: u32::deserialize(version, stream)?,
                exptime: u32::deserialize(version, stream)?,
                add_policy: AddPolicy::deserialize(version, stream)?,
                replace_policy: ReplacePolicy::deserialize(version, stream)?,
                return_old: bool::deserialize(version, stream)?,
            }),
            2 => Ok(Mutation::IncrDecr {
                key,
                kind: IncrDecrKind::deserialize(version, stream)?,
                amount: u64::deserialize(version, stream)?,
            }),
            3 => Ok(Mutation::AppendPrepend {
                key,
                kind: AppendPrependKind::deserialize(version, stream)?,
                data: stream.take_bytes(version)?.to_vec(),
            }),
            4 => Ok(Mutation::Delete {
                key,
                dont_put_in_delete_queue: bool::deserialize(version, stream)?,
            }),
            tag => Err(DecodeError::InvalidTag { what: "mutation", tag }),
        }
    }
}

impl Archive for MutationResult {
    fn serialize<S: Sink>(&self, version: ClusterVersion, sink: &mut S) {
        match self {
            MutationResult::GetCas(value) => {
                sink.put_u8(0);
                value.serialize(version, sink);
            }
            MutationResult::Set { result, old_value } => {
                sink.put_u8(1);
                result.serialize(version, sink);
                old_value.serialize(version, sink);
            }
            MutationResult::IncrDecr(result) => {
                sink.put_u8(2);
                result.serialize(version, sink);
            }
            MutationResult::AppendPrepend(result) => {
                sink.put_u8(3);
                result.serialize(version, sink);
            }
            MutationResult::Delete(result) => {
                sink.put_u8(4);
                result.serialize(version, sink);
            }
        }
    }

    fn deserialize(version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        match stream.take_u8()? {
            0 => Ok(MutationResult::GetCas(Option::deserialize(version, stream)?)),
            1 => Ok(MutationResult::Set {
                result: SetResult::deserialize(version, stream)?,
                old_value: Option::deserialize(version, stream)?,
            }),
            2 => Ok(MutationResult::IncrDecr(IncrDecrResult::deserialize(version, stream)?)),
            3 => Ok(MutationResult::AppendPrepend(AppendPrependResult::deserialize(
                version, stream,
            )?)),
            4 => Ok(MutationResult::Delete(DeleteResult::deserialize(version, stream)?)),
            tag => Err(DecodeError::InvalidTag { what: "mutation_result", tag }),
        }
    }
}
