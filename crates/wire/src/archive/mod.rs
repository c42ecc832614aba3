//! Versioned binary archives
//!
//! This module is the gateway every persisted or wire-bound value goes
//! through:
//!
//! - [`encode_for_version`]: value to bytes in the format of a version
//! - [`decode_for_version`]: bytes to value, assuming a version
//! - [`encoded_size_for_version`]: encoded size without allocating
//!
//! None of these write or read the version itself; the caller knows it out
//! of band (or uses [`encode_cluster_version`] explicitly).
//!
//! ## Format Stability
//!
//! The output for an already-enumerated [`ClusterVersion`] must never change.
//! Adding a version means adding a variant and extending every `match` on
//! `ClusterVersion`; existing arms stay byte-for-byte identical. Golden-byte
//! tests for each version enforce this.

mod error;
mod impls;
mod stream;
mod version;

pub use error::DecodeError;
pub use stream::{ReadStream, SizeCounter, Sink};
pub use version::{decode_cluster_version, encode_cluster_version, ClusterVersion};

/// A type with a versioned binary encoding
///
/// Implementations must be deterministic, and for every version `V`,
/// `decode(V, encode(V, x)) == x`.
pub trait Archive: Sized {
    /// Write `self` in the format of `version`
    fn serialize<S: Sink>(&self, version: ClusterVersion, sink: &mut S);

    /// Read a value in the format of `version`
    fn deserialize(version: ClusterVersion, stream: &mut ReadStream<'_>)
        -> Result<Self, DecodeError>;
}

/// Encode a value for a version
///
/// DOES NOT write the version tag.
pub fn encode_for_version<T: Archive>(version: ClusterVersion, value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    match version {
        ClusterVersion::V1_13 => value.serialize(ClusterVersion::V1_13, &mut out),
        ClusterVersion::V1_13_2 => value.serialize(ClusterVersion::V1_13_2, &mut out),
    }
    out
}

/// Decode a value encoded for a version
///
/// The whole input must be consumed; leftover bytes are an error.
pub fn decode_for_version<T: Archive>(
    version: ClusterVersion,
    bytes: &[u8],
) -> Result<T, DecodeError> {
    let mut stream = ReadStream::new(bytes);
    let value = match version {
        ClusterVersion::V1_13 => T::deserialize(ClusterVersion::V1_13, &mut stream)?,
        ClusterVersion::V1_13_2 => T::deserialize(ClusterVersion::V1_13_2, &mut stream)?,
    };
    if stream.remaining() != 0 {
        return Err(DecodeError::TrailingBytes(stream.remaining()));
    }
    Ok(value)
}

/// Size of a value's encoding for a version
pub fn encoded_size_for_version<T: Archive>(version: ClusterVersion, value: &T) -> usize {
    let mut counter = SizeCounter::default();
    match version {
        ClusterVersion::V1_13 => value.serialize(ClusterVersion::V1_13, &mut counter),
        ClusterVersion::V1_13_2 => value.serialize(ClusterVersion::V1_13_2, &mut counter),
    }
    counter.size
}

/// Encode a value for live cluster traffic
pub fn encode_for_cluster<T: Archive>(value: &T) -> Vec<u8> {
    encode_for_version(ClusterVersion::CLUSTER, value)
}

/// Encode a value for persistence
pub fn encode_for_disk<T: Archive>(value: &T) -> Vec<u8> {
    encode_for_version(ClusterVersion::LATEST_DISK, value)
}

/// Encode a value prefixed with its version tag
pub fn encode_tagged<T: Archive>(version: ClusterVersion, value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    encode_cluster_version(&mut out, version);
    out.extend_from_slice(&encode_for_version(version, value));
    out
}

/// Decode a value prefixed with its version tag
///
/// A tag outside the supported range aborts.
pub fn decode_tagged<T: Archive>(bytes: &[u8]) -> Result<(ClusterVersion, T), DecodeError> {
    let mut stream = ReadStream::new(bytes);
    let version = decode_cluster_version(&mut stream)?;
    let rest = stream.take(stream.remaining())?;
    Ok((version, decode_for_version(version, rest)?))
}
