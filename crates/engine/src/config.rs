//! Shard configuration
//!
//! [`SliceOptions`] are plain data with defaults and named presets. They can
//! be loaded from TOML; every field is optional there and falls back to its
//! default.
//!
//! ```toml
//! backfill_priority = 5
//! max_leaf_deletions = 64
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// I/O priority given to backfill traffic by default
pub const BACKFILL_CACHE_PRIORITY: i32 = 10;

/// Eviction priority the root node starts with
pub const INITIAL_ROOT_EVICTION_PRIORITY: i32 = 100;

/// Errors loading or validating shard options
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config text is not valid TOML for these options
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Options parsed but are not usable
    #[error("invalid option {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Options for a [`crate::Slice`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceOptions {
    /// Eviction priority assigned to the root node
    pub initial_root_eviction_priority: i32,
    /// I/O priority of the backfill account
    pub backfill_priority: i32,
    /// Deletions a leaf remembers before it forgets the oldest
    pub max_leaf_deletions: usize,
    /// Largest payload a mutation may store
    pub max_value_size: usize,
}

impl Default for SliceOptions {
    fn default() -> Self {
        SliceOptions {
            initial_root_eviction_priority: INITIAL_ROOT_EVICTION_PRIORITY,
            backfill_priority: BACKFILL_CACHE_PRIORITY,
            max_leaf_deletions: 32,
            max_value_size: arbor_core::DEFAULT_MAX_VALUE_SIZE,
        }
    }
}

impl SliceOptions {
    /// Keep more deletion history, so lagging replicas rarely need a range wipe
    pub fn replication_heavy() -> Self {
        SliceOptions {
            max_leaf_deletions: 256,
            ..Default::default()
        }
    }

    /// Small values and short history, for tests that exercise node splits
    pub fn compact() -> Self {
        SliceOptions {
            max_leaf_deletions: 4,
            max_value_size: 128,
            ..Default::default()
        }
    }

    /// Parse options from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let options: SliceOptions = toml::from_str(text)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let options = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?options, "loaded slice options");
        Ok(options)
    }

    /// Check the options are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backfill_priority <= 0 {
            return Err(ConfigError::Invalid {
                field: "backfill_priority",
                reason: format!("must be positive, got {}", self.backfill_priority),
            });
        }
        if self.max_value_size == 0 {
            return Err(ConfigError::Invalid {
                field: "max_value_size",
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}
