//! Convenient imports for arbor.
//!
//! ```
//! use arbor::prelude::*;
//! ```

// Main entry points
pub use arbor_engine::{Slice, SliceOptions};
pub use arbor_storage::{Access, Cache, CacheConfig};

// Error handling
pub use crate::error::{Error, Result};

// Core types
pub use arbor_core::{
    Cas, CasGenerator, Castime, KeyRange, OrderToken, ReplTimestamp, RightBound, StoreKey,
    StoredValue,
};

// Ordering
pub use arbor_concurrency::{OrderCheckpoint, OrderSource};

// Mutations and results
pub use arbor_engine::{
    AddPolicy, AppendPrependKind, AppendPrependResult, DeleteResult, IncrDecrKind,
    IncrDecrResult, Mutation, MutationResult, ReplacePolicy, SetResult,
};

// Range operations
pub use arbor_engine::{BackfillAtom, BackfillCallback, KeyTester, KeyWithData, RgetBoundMode};
