//! Slice Integration Tests
//!
//! Exercises a shard end to end through the public facade: lifecycle and
//! superblock fields, mutations, range operations, ordering, concurrency
//! and the versioned encoding.

mod common;

mod concurrency;
mod encoding;
mod lifecycle;
mod mutations;
mod ordering;
mod ranges;
