//! Byte sinks and read streams
//!
//! All integers are little-endian. Length prefixes are the one place the
//! supported versions differ: `V1_13` writes a fixed `u32`, `V1_13_2` writes
//! an LEB128 varint.

use super::{ClusterVersion, DecodeError};
use arbor_core::fatal;
use byteorder::{ByteOrder, LittleEndian};

/// Destination for encoded bytes
pub trait Sink {
    /// Append raw bytes
    fn put(&mut self, bytes: &[u8]);

    /// Append a `u8`
    fn put_u8(&mut self, n: u8) {
        self.put(&[n]);
    }

    /// Append a little-endian `u32`
    fn put_u32(&mut self, n: u32) {
        let mut buf = [0u8; 4];
        LittleEndian::write_u32(&mut buf, n);
        self.put(&buf);
    }

    /// Append a little-endian `u64`
    fn put_u64(&mut self, n: u64) {
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, n);
        self.put(&buf);
    }

    /// Append an LEB128 varint
    fn put_varint(&mut self, mut n: u64) {
        let mut buf = [0u8; 10];
        let mut i = 0;
        loop {
            let byte = (n & 0x7f) as u8;
            n >>= 7;
            if n == 0 {
                buf[i] = byte;
                i += 1;
                break;
            }
            buf[i] = byte | 0x80;
            i += 1;
        }
        self.put(&buf[..i]);
    }

    /// Append a length prefix in the format of `version`
    ///
    /// `V1_13` cannot frame 4 GiB or more; asking it to is fatal.
    fn put_len(&mut self, version: ClusterVersion, len: usize) {
        match version {
            ClusterVersion::V1_13 => match u32::try_from(len) {
                Ok(n) => self.put_u32(n),
                Err(_) => fatal::consistency_failure(&format!(
                    "length {} does not fit a {} length prefix",
                    len, version
                )),
            },
            ClusterVersion::V1_13_2 => self.put_varint(len as u64),
        }
    }

    /// Append a length-prefixed byte string
    fn put_bytes(&mut self, version: ClusterVersion, bytes: &[u8]) {
        self.put_len(version, bytes.len());
        self.put(bytes);
    }
}

impl Sink for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Sink that only counts bytes
#[derive(Debug, Default, Clone, Copy)]
pub struct SizeCounter {
    /// Bytes written so far
    pub size: usize,
}

impl Sink for SizeCounter {
    fn put(&mut self, bytes: &[u8]) {
        self.size += bytes.len();
    }
}

/// Cursor over encoded bytes
#[derive(Debug, Clone)]
pub struct ReadStream<'a> {
    buf: &'a [u8],
}

impl<'a> ReadStream<'a> {
    /// Stream over `buf`
    pub fn new(buf: &'a [u8]) -> Self {
        ReadStream { buf }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    /// Consume exactly `n` bytes
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.buf.len() < n {
            return Err(DecodeError::UnexpectedEnd {
                needed: n,
                remaining: self.buf.len(),
            });
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    /// Consume a `u8`
    pub fn take_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    /// Consume a little-endian `u32`
    pub fn take_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    /// Consume a little-endian `u64`
    pub fn take_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    /// Consume an LEB128 varint
    pub fn take_varint(&mut self) -> Result<u64, DecodeError> {
        let mut result: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = self.take_u8()?;
            if shift == 63 && byte > 1 {
                return Err(DecodeError::VarintOverflow);
            }
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift > 63 {
                return Err(DecodeError::VarintOverflow);
            }
        }
    }

    /// Consume a length prefix in the format of `version`
    pub fn take_len(&mut self, version: ClusterVersion) -> Result<usize, DecodeError> {
        let len = match version {
            ClusterVersion::V1_13 => u64::from(self.take_u32()?),
            ClusterVersion::V1_13_2 => self.take_varint()?,
        };
        let len = usize::try_from(len).map_err(|_| DecodeError::LengthOutOfRange(len))?;
        if len > self.buf.len() {
            return Err(DecodeError::UnexpectedEnd {
                needed: len,
                remaining: self.buf.len(),
            });
        }
        Ok(len)
    }

    /// Consume a length-prefixed byte string
    pub fn take_bytes(&mut self, version: ClusterVersion) -> Result<&'a [u8], DecodeError> {
        let len = self.take_len(version)?;
        self.take(len)
    }
}
