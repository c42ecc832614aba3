//! Versioned binary encoding for arbor
//!
//! This crate implements the format-version gateway. Every value that is
//! persisted (superblock metainfo, tree nodes) or sent between nodes
//! (mutations, backfill atoms) is encoded for an explicit
//! [`ClusterVersion`]:
//!
//! | Alias | Used for |
//! |-------|----------|
//! | `ClusterVersion::CLUSTER` | live wire traffic |
//! | `ClusterVersion::LATEST_DISK` | newly persisted data |
//!
//! ## Examples
//!
//! ```
//! use arbor_wire::{decode_for_version, encode_for_version, ClusterVersion};
//! use arbor_core::{KeyRange, StoreKey};
//!
//! let range = KeyRange::from(StoreKey::new("m").unwrap());
//! let bytes = encode_for_version(ClusterVersion::LATEST_DISK, &range);
//! let decoded: KeyRange = decode_for_version(ClusterVersion::LATEST_DISK, &bytes).unwrap();
//! assert_eq!(decoded, range);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archive;

// Re-export main types
pub use archive::{
    decode_cluster_version, decode_for_version, decode_tagged, encode_cluster_version,
    encode_for_cluster, encode_for_disk, encode_for_version, encode_tagged,
    encoded_size_for_version, Archive, ClusterVersion, DecodeError, ReadStream, SizeCounter,
    Sink,
};
