//! Causal order tokens
//!
//! An [`OrderToken`] marks a position in a caller's logical operation stream.
//! Tokens are issued per bucket in increasing `value` order by an order
//! source and stamped with a checkpoint position when they pass through an
//! order checkpoint.

/// Bucket of tokens that are not subject to ordering checks
pub const IGNORE_BUCKET: u32 = u32::MAX;

/// Position marker in a logical operation stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderToken {
    bucket: u32,
    value: u64,
    tag: &'static str,
    position: Option<u64>,
}

impl OrderToken {
    /// Create a token at `value` in `bucket`
    pub fn new(bucket: u32, value: u64) -> Self {
        OrderToken {
            bucket,
            value,
            tag: "",
            position: None,
        }
    }

    /// A token that bypasses ordering checks
    pub fn ignore() -> Self {
        Self::new(IGNORE_BUCKET, 0)
    }

    /// Check if this token bypasses ordering checks
    pub fn is_ignore(&self) -> bool {
        self.bucket == IGNORE_BUCKET
    }

    /// Bucket (stream) identifier
    pub fn bucket(&self) -> u32 {
        self.bucket
    }

    /// Position within the bucket, as issued by the caller
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Name of the last checkpoint this token passed
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Position assigned by the last checkpoint, if any
    pub fn position(&self) -> Option<u64> {
        self.position
    }

    /// Copy of this token stamped by a checkpoint
    pub fn with_checkpoint(self, tag: &'static str, position: u64) -> Self {
        OrderToken {
            tag,
            position: Some(position),
            ..self
        }
    }
}

impl std::fmt::Display for OrderToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_ignore() {
            return write!(f, "order_token(ignore)");
        }
        write!(f, "order_token({}:{}", self.bucket, self.value)?;
        if let Some(position) = self.position {
            write!(f, " @{}#{}", self.tag, position)?;
        }
        write!(f, ")")
    }
}
