//! Format versions
//!
//! The set of supported versions is a small contiguous range. Cluster
//! traffic always uses [`ClusterVersion::CLUSTER`]; persisted data uses
//! [`ClusterVersion::LATEST_DISK`]. The two aliases are kept separate so a
//! type's wire format and disk format can be frozen independently.

use super::stream::{ReadStream, Sink};
use super::DecodeError;
use arbor_core::fatal;

/// Enumerated format versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i8)]
pub enum ClusterVersion {
    /// First versioned format; fixed-width length prefixes
    V1_13 = 0,
    /// Varint length prefixes
    V1_13_2 = 1,
}

impl ClusterVersion {
    /// Oldest supported version
    pub const EARLIEST: ClusterVersion = ClusterVersion::V1_13;

    /// Newest version of any kind
    pub const LATEST_OVERALL: ClusterVersion = ClusterVersion::V1_13_2;

    /// Version used for live cluster traffic
    pub const CLUSTER: ClusterVersion = ClusterVersion::LATEST_OVERALL;

    /// Version used for newly persisted data
    pub const LATEST_DISK: ClusterVersion = ClusterVersion::V1_13_2;

    /// Every supported version, oldest first
    pub const ALL: [ClusterVersion; 2] = [ClusterVersion::V1_13, ClusterVersion::V1_13_2];

    /// Numeric tag
    pub fn tag(self) -> i8 {
        self as i8
    }

    /// Look up a version by tag
    ///
    /// Returns `None` for tags outside the contiguous supported range.
    pub fn from_tag(tag: i8) -> Option<ClusterVersion> {
        if tag < Self::EARLIEST.tag() || tag > Self::LATEST_OVERALL.tag() {
            return None;
        }
        Self::ALL.iter().copied().find(|v| v.tag() == tag)
    }

    /// Look up a version by tag, aborting if it is out of range
    ///
    /// An unknown tag in persisted or received data means the peer or the
    /// file was written by an incompatible build.
    pub fn from_tag_or_abort(tag: i8) -> ClusterVersion {
        match Self::from_tag(tag) {
            Some(v) => v,
            None => fatal::version_out_of_range(i64::from(tag)),
        }
    }
}

impl std::fmt::Display for ClusterVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterVersion::V1_13 => write!(f, "v1.13"),
            ClusterVersion::V1_13_2 => write!(f, "v1.13.2"),
        }
    }
}

/// Write a version tag
///
/// Tags are always written in the latest overall format. This encoding must
/// never change.
pub fn encode_cluster_version<S: Sink>(sink: &mut S, version: ClusterVersion) {
    sink.put(&[version.tag() as u8]);
}

/// Read a version tag
///
/// Truncated input is a [`DecodeError`]; a tag outside the supported range
/// aborts the process.
pub fn decode_cluster_version(stream: &mut ReadStream<'_>) -> Result<ClusterVersion, DecodeError> {
    let tag = stream.take_u8()? as i8;
    Ok(ClusterVersion::from_tag_or_abort(tag))
}
