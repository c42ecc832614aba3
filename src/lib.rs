//! # Arbor
//!
//! Shard layer for a replicated key-value store.
//!
//! Each shard is a [`Slice`]: a B+tree over a block cache, with a superblock
//! holding the root, replication metadata and the shard's key range. Point
//! writes go through a closed set of [`Mutation`]s; range reads, predicate
//! erases and timestamp-driven backfill walk the tree in key order.
//!
//! ## Quick Start
//!
//! ```
//! use arbor::prelude::*;
//! use std::sync::Arc;
//!
//! let cache = Arc::new(Cache::new(CacheConfig::default())?);
//! Slice::create_universe(&cache)?;
//! let slice = Slice::open(cache)?;
//!
//! let key = StoreKey::new("greeting")?;
//! let castime = Castime::new(Cas(1), ReplTimestamp(1));
//! slice.change(&Mutation::set(key.clone(), "hello"), castime, OrderToken::ignore())?;
//!
//! let value = slice.get(&key, OrderToken::ignore())?;
//! assert_eq!(value.map(|v| v.data), Some(b"hello".to_vec()));
//! # Ok::<(), arbor::Error>(())
//! ```
//!
//! ## Crates
//!
//! - `arbor-core` - keys, ranges, timestamps, values, order tokens
//! - `arbor-wire` - versioned binary encoding
//! - `arbor-storage` - block cache, transactions, I/O accounts
//! - `arbor-concurrency` - order sources and checkpoints
//! - `arbor-engine` - superblock, B+tree and the slice handle

#![warn(missing_docs)]

mod error;

pub mod prelude;

pub use error::{Error, Result};

pub use arbor_concurrency::{OrderCheckpoint, OrderSource};
pub use arbor_core::{
    Cas, CasGenerator, Castime, KeyRange, OrderToken, ReplTimestamp, RightBound, StoreKey,
    StoredValue,
};
pub use arbor_engine::{
    BackfillAtom, BackfillCallback, KeyWithData, Mutation, MutationResult, RgetBoundMode,
    Slice, SliceOptions,
};
pub use arbor_storage::{Cache, CacheConfig};
pub use arbor_wire::ClusterVersion;
