//! Block pool configuration

use core::alloc::Layout;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};

/// Default number of idle blocks a pool caches.
pub const DEFAULT_CAPACITY: usize = 16384;

/// Default block size in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

/// Default block alignment in bytes.
pub const DEFAULT_BLOCK_ALIGN: usize = 16;

/// Configuration for a [`BlockPool`](crate::BlockPool)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    /// Size of every block in bytes, fixed for the pool's lifetime
    pub block_size: usize,
    /// Maximum number of idle blocks kept for reuse; 0 disables caching
    pub capacity: usize,
    /// Alignment of every block (power of two)
    pub block_align: usize,
    /// Fill pattern byte for freshly allocated blocks (for debugging)
    pub alloc_pattern: Option<u8>,
    /// Fill pattern byte for blocks entering the cache (for debugging)
    pub release_pattern: Option<u8>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            capacity: DEFAULT_CAPACITY,
            block_align: DEFAULT_BLOCK_ALIGN,
            alloc_pattern: None,
            release_pattern: None,
        }
    }
}

impl PoolConfig {
    /// Configuration for `block_size`-byte blocks caching up to `capacity`
    pub fn new(block_size: usize, capacity: usize) -> Self {
        Self {
            block_size,
            capacity,
            ..Self::default()
        }
    }

    /// Production configuration - no fill patterns
    #[must_use]
    pub fn production(block_size: usize, capacity: usize) -> Self {
        Self::new(block_size, capacity)
    }

    /// Debug configuration - poisons fresh and recycled blocks
    #[must_use]
    pub fn debug(block_size: usize, capacity: usize) -> Self {
        Self {
            alloc_pattern: Some(0xBB),
            release_pattern: Some(0xDD),
            ..Self::new(block_size, capacity)
        }
    }

    /// Set block alignment
    pub fn with_block_align(mut self, block_align: usize) -> Self {
        self.block_align = block_align;
        self
    }

    /// Set fill pattern for freshly allocated blocks
    pub fn with_alloc_pattern(mut self, pattern: u8) -> Self {
        self.alloc_pattern = Some(pattern);
        self
    }

    /// Set fill pattern for released blocks that are cached
    pub fn with_release_pattern(mut self, pattern: u8) -> Self {
        self.release_pattern = Some(pattern);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> PoolResult<()> {
        if self.block_size == 0 {
            return Err(PoolError::invalid_config(
                "block_size must be greater than 0",
            ));
        }
        if !self.block_align.is_power_of_two() {
            return Err(PoolError::invalid_config(format!(
                "block_align ({}) must be a power of two",
                self.block_align
            )));
        }
        self.block_layout().map(|_| ())
    }

    /// Layout of a single block
    pub fn block_layout(&self) -> PoolResult<Layout> {
        Layout::from_size_align(self.block_size, self.block_align).map_err(|_| {
            PoolError::invalid_config(format!(
                "block_size ({}) with block_align ({}) does not form a valid layout",
                self.block_size, self.block_align
            ))
        })
    }
}
