//! Causal ordering for shard operations
//!
//! This crate provides the ordering gate a shard runs every token-driven
//! operation through:
//! - OrderSource: issues increasing tokens for one client bucket
//! - OrderCheckpoint: stamps tokens with strictly increasing positions
//!   and flags tokens that arrive out of order

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checkpoint;
pub mod source;

pub use checkpoint::OrderCheckpoint;
pub use source::OrderSource;
