//! Shard-level storage engine for arbor
//!
//! A shard (a [`Slice`]) is one partition of the keyspace stored as a
//! B+tree in the block cache. This crate provides:
//! - Slice: create/open, the token-driven and transaction-supplied
//!   operation shapes, and superblock field access
//! - GotSuperblock: the locked superblock and its fixed-offset layout
//! - Mutation: the closed set of point writes and their results
//! - B+tree operations: get, rget, modify, erase_range and backfill
//! - SliceOptions: tunables with presets and TOML loading
//!
//! # Ordering
//!
//! Token-driven operations pass the slice's order checkpoint before opening
//! a transaction and a second checkpoint after. Tokens that arrive out of
//! order within a bucket are logged and counted.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod btree;
pub mod config;
pub mod mutation;
pub mod node;
pub mod slice;
pub mod superblock;

pub use btree::backfill::{BackfillAtom, BackfillCallback};
pub use btree::erase_range::{EraseBounds, KeyTester};
pub use btree::rget::{KeyWithData, RgetBoundMode, RgetResult};
pub use config::{ConfigError, SliceOptions, BACKFILL_CACHE_PRIORITY, INITIAL_ROOT_EVICTION_PRIORITY};
pub use mutation::{
    AddPolicy, AppendPrependKind, AppendPrependResult, DeleteResult, IncrDecrKind,
    IncrDecrResult, Mutation, MutationResult, ReplacePolicy, SetResult,
};
pub use slice::Slice;
pub use superblock::{GotSuperblock, Metainfo, KEY_RANGE_METAINFO_KEY};
