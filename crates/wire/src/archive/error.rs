//! Decode errors
//!
//! Malformed input is a value-level error: the bytes came from somewhere the
//! caller can reject. A version tag outside the supported range is not
//! represented here; see [`super::version`].

use thiserror::Error;

/// Errors from decoding a versioned archive
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ended before the value was complete
    #[error("unexpected end of input: need {needed} bytes, have {remaining}")]
    UnexpectedEnd {
        /// Bytes the decoder asked for
        needed: usize,
        /// Bytes left in the input
        remaining: usize,
    },

    /// Input continued after the value was complete
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    /// An enum discriminant was not recognised
    #[error("invalid {what} tag: {tag}")]
    InvalidTag {
        /// Name of the type being decoded
        what: &'static str,
        /// The tag that was read
        tag: u8,
    },

    /// A varint ran past 64 bits
    #[error("varint overflow")]
    VarintOverflow,

    /// A length prefix does not fit in memory
    #[error("length {0} out of range")]
    LengthOutOfRange(u64),

    /// A decoded key violates key constraints
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl From<DecodeError> for arbor_core::Error {
    fn from(e: DecodeError) -> Self {
        arbor_core::Error::SerializationError(e.to_string())
    }
}
