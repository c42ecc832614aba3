//! Cache configuration

use crate::error::{CacheError, Result};
use serde::Deserialize;

/// Smallest block size the cache accepts
pub const MIN_BLOCK_SIZE: usize = 512;

/// Block cache options
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Size of a block in bytes
    pub block_size: usize,
    /// I/O priority of the default (foreground) account
    pub default_priority: i32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            block_size: 4096,
            default_priority: 100,
        }
    }
}

impl CacheConfig {
    /// Small blocks, so tests exercise node splits quickly
    pub fn small_blocks() -> Self {
        CacheConfig {
            block_size: MIN_BLOCK_SIZE,
            ..Default::default()
        }
    }

    /// Check the options are usable
    pub fn validate(&self) -> Result<()> {
        if self.block_size < MIN_BLOCK_SIZE {
            return Err(CacheError::InvalidConfig(format!(
                "block_size {} is below the minimum of {}",
                self.block_size, MIN_BLOCK_SIZE
            )));
        }
        if self.default_priority <= 0 {
            return Err(CacheError::InvalidConfig(format!(
                "default_priority must be positive, got {}",
                self.default_priority
            )));
        }
        Ok(())
    }
}
