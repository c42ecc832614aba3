//! Archive implementations for primitives and core types

use super::{Archive, ClusterVersion, DecodeError, ReadStream, Sink};
use arbor_core::{Cas, Castime, KeyRange, ReplTimestamp, RightBound, StoreKey, StoredValue};

impl Archive for u8 {
    fn serialize<S: Sink>(&self, _version: ClusterVersion, sink: &mut S) {
        sink.put_u8(*self);
    }

    fn deserialize(_version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        stream.take_u8()
    }
}

impl Archive for bool {
    fn serialize<S: Sink>(&self, _version: ClusterVersion, sink: &mut S) {
        sink.put_u8(u8::from(*self));
    }

    fn deserialize(_version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        match stream.take_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(DecodeError::InvalidTag { what: "bool", tag }),
        }
    }
}

impl Archive for u32 {
    fn serialize<S: Sink>(&self, _version: ClusterVersion, sink: &mut S) {
        sink.put_u32(*self);
    }

    fn deserialize(_version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        stream.take_u32()
    }
}

impl Archive for u64 {
    fn serialize<S: Sink>(&self, _version: ClusterVersion, sink: &mut S) {
        sink.put_u64(*self);
    }

    fn deserialize(_version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        stream.take_u64()
    }
}

impl<T: Archive> Archive for Option<T> {
    fn serialize<S: Sink>(&self, version: ClusterVersion, sink: &mut S) {
        match self {
            None => sink.put_u8(0),
            Some(v) => {
                sink.put_u8(1);
                v.serialize(version, sink);
            }
        }
    }

    fn deserialize(version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        match stream.take_u8()? {
            0 => Ok(None),
            1 => Ok(Some(T::deserialize(version, stream)?)),
            tag => Err(DecodeError::InvalidTag { what: "option", tag }),
        }
    }
}

// A Vec<u8> encodes exactly like a length-prefixed byte string.
impl<T: Archive> Archive for Vec<T> {
    fn serialize<S: Sink>(&self, version: ClusterVersion, sink: &mut S) {
        sink.put_len(version, self.len());
        for item in self {
            item.serialize(version, sink);
        }
    }

    fn deserialize(version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        let len = stream.take_len(version)?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(T::deserialize(version, stream)?);
        }
        Ok(items)
    }
}

impl<A: Archive, B: Archive> Archive for (A, B) {
    fn serialize<S: Sink>(&self, version: ClusterVersion, sink: &mut S) {
        self.0.serialize(version, sink);
        self.1.serialize(version, sink);
    }

    fn deserialize(version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        let a = A::deserialize(version, stream)?;
        let b = B::deserialize(version, stream)?;
        Ok((a, b))
    }
}

impl Archive for StoreKey {
    fn serialize<S: Sink>(&self, version: ClusterVersion, sink: &mut S) {
        sink.put_bytes(version, self.as_bytes());
    }

    fn deserialize(version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        let bytes = stream.take_bytes(version)?;
        StoreKey::new(bytes).map_err(|e| DecodeError::InvalidKey(e.to_string()))
    }
}

impl Archive for KeyRange {
    fn serialize<S: Sink>(&self, version: ClusterVersion, sink: &mut S) {
        self.left.serialize(version, sink);
        match &self.right {
            RightBound::Unbounded => sink.put_u8(0),
            RightBound::Exclusive(key) => {
                sink.put_u8(1);
                key.serialize(version, sink);
            }
        }
    }

    fn deserialize(version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        let left = StoreKey::deserialize(version, stream)?;
        let right = match stream.take_u8()? {
            0 => RightBound::Unbounded,
            1 => RightBound::Exclusive(StoreKey::deserialize(version, stream)?),
            tag => {
                return Err(DecodeError::InvalidTag {
                    what: "right bound",
                    tag,
                })
            }
        };
        Ok(KeyRange { left, right })
    }
}

impl Archive for ReplTimestamp {
    fn serialize<S: Sink>(&self, _version: ClusterVersion, sink: &mut S) {
        sink.put_u64(self.0);
    }

    fn deserialize(_version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        Ok(ReplTimestamp(stream.take_u64()?))
    }
}

impl Archive for Cas {
    fn serialize<S: Sink>(&self, _version: ClusterVersion, sink: &mut S) {
        sink.put_u64(self.0);
    }

    fn deserialize(_version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        Ok(Cas(stream.take_u64()?))
    }
}

impl Archive for Castime {
    fn serialize<S: Sink>(&self, version: ClusterVersion, sink: &mut S) {
        self.proposed_cas.serialize(version, sink);
        self.timestamp.serialize(version, sink);
    }

    fn deserialize(version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        let proposed_cas = Cas::deserialize(version, stream)?;
        let timestamp = ReplTimestamp::deserialize(version, stream)?;
        Ok(Castime {
            proposed_cas,
            timestamp,
        })
    }
}

impl Archive for StoredValue {
    fn serialize<S: Sink>(&self, version: ClusterVersion, sink: &mut S) {
        sink.put_bytes(version, &self.data);
        sink.put_u32(self.flags);
        sink.put_u32(self.exptime);
        self.cas.serialize(version, sink);
        self.timestamp.serialize(version, sink);
    }

    fn deserialize(version: ClusterVersion, stream: &mut ReadStream<'_>) -> Result<Self, DecodeError> {
        let data = stream.take_bytes(version)?.to_vec();
        let flags = stream.take_u32()?;
        let exptime = stream.take_u32()?;
        let cas = Option::<Cas>::deserialize(version, stream)?;
        let timestamp = ReplTimestamp::deserialize(version, stream)?;
        Ok(StoredValue {
            data,
            flags,
            exptime,
            cas,
            timestamp,
        })
    }
}
