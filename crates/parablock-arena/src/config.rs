//! Block list configuration parameters.

use std::alloc::Layout;

use parablock_core::MAX_THREAD_COUNT;

use crate::error::BlockListError;

/// Configuration for a block list.
///
/// Controls record size, block capacity and the size of the thread-index
/// domain. Validated at construction; all values are immutable after
/// creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockListConfig {
    /// Size of one record in bytes. Must be non-zero.
    pub element_size: usize,

    /// Number of records one block holds. Must be non-zero.
    ///
    /// Default: 256. Each block is `element_size * elements_per_block`
    /// bytes, fixed for the lifetime of the list.
    pub elements_per_block: usize,

    /// Number of per-thread chains. `None` = auto-detect
    /// (`available_parallelism`, clamped to `[1, MAX_THREAD_COUNT]`).
    ///
    /// Every thread index passed to a write must be below this value.
    pub thread_count: Option<usize>,

    /// Alignment every record slot is guaranteed to have.
    ///
    /// Must be a power of two that divides `element_size`. Blocks are
    /// aligned to `max(element_align, BLOCK_ALIGN)`.
    pub element_align: usize,
}

impl BlockListConfig {
    /// Default number of records per block.
    pub const DEFAULT_ELEMENTS_PER_BLOCK: usize = 256;

    /// Minimum block alignment: one cache line.
    pub const BLOCK_ALIGN: usize = 64;

    /// Create a config for raw records of `element_size` bytes.
    ///
    /// Records carry no alignment requirement beyond one byte; the thread
    /// count is auto-detected.
    pub fn new(element_size: usize, elements_per_block: usize) -> Self {
        Self {
            element_size,
            elements_per_block,
            thread_count: None,
            element_align: 1,
        }
    }

    /// Create a config sized and aligned for records of type `T`.
    pub fn for_type<T>(elements_per_block: usize) -> Self {
        Self {
            element_size: std::mem::size_of::<T>(),
            elements_per_block,
            thread_count: None,
            element_align: std::mem::align_of::<T>(),
        }
    }

    /// Set an explicit thread count.
    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = Some(thread_count);
        self
    }

    /// Number of chains the list will own.
    ///
    /// Explicit values are returned unchanged (validation rejects values
    /// outside `[1, MAX_THREAD_COUNT]`).
    pub fn resolved_thread_count(&self) -> usize {
        match self.thread_count {
            Some(n) => n,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .clamp(1, MAX_THREAD_COUNT),
        }
    }

    /// Size of a single block in bytes (saturating).
    pub fn block_bytes(&self) -> usize {
        self.element_size.saturating_mul(self.elements_per_block)
    }

    /// Check all invariants and compute the block layout.
    pub fn validate(&self) -> Result<Layout, BlockListError> {
        if self.element_size == 0 {
            return Err(invalid("element_size must be at least 1"));
        }
        if self.elements_per_block == 0 {
            return Err(invalid("elements_per_block must be at least 1"));
        }
        if let Some(n) = self.thread_count {
            if n == 0 || n > MAX_THREAD_COUNT {
                return Err(invalid(format!(
                    "thread_count must be in [1, {MAX_THREAD_COUNT}] (got {n})"
                )));
            }
        }
        if !self.element_align.is_power_of_two() {
            return Err(invalid(format!(
                "element_align must be a power of two (got {})",
                self.element_align
            )));
        }
        if self.element_size % self.element_align != 0 {
            return Err(invalid(format!(
                "element_size {} is not a multiple of element_align {}",
                self.element_size, self.element_align
            )));
        }
        let size = self
            .element_size
            .checked_mul(self.elements_per_block)
            .ok_or_else(|| {
                invalid(format!(
                    "block size overflows: {} * {}",
                    self.element_size, self.elements_per_block
                ))
            })?;
        Layout::from_size_align(size, self.element_align.max(Self::BLOCK_ALIGN))
            .map_err(|e| invalid(format!("block layout rejected: {e}")))
    }
}

impl Default for BlockListConfig {
    fn default() -> Self {
        Self::new(std::mem::size_of::<u32>(), Self::DEFAULT_ELEMENTS_PER_BLOCK)
    }
}

fn invalid(reason: impl Into<String>) -> BlockListError {
    BlockListError::InvalidConfig {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_bytes_is_size_times_capacity() {
        let config = BlockListConfig::new(12, 100);
        assert_eq!(config.block_bytes(), 1200);
        let layout = config.validate().unwrap();
        assert_eq!(layout.size(), 1200);
        assert_eq!(layout.align(), BlockListConfig::BLOCK_ALIGN);
    }

    #[test]
    fn for_type_matches_layout() {
        #[repr(C, align(128))]
        struct Wide([u8; 128]);
        let config = BlockListConfig::for_type::<Wide>(4);
        assert_eq!(config.element_size, 128);
        assert_eq!(config.validate().unwrap().align(), 128);
    }

    #[test]
    fn zero_element_size_rejected() {
        let err = BlockListConfig::new(0, 4).validate().unwrap_err();
        assert!(matches!(err, BlockListError::InvalidConfig { .. }));
    }

    #[test]
    fn zero_block_capacity_rejected() {
        assert!(BlockListConfig::new(4, 0).validate().is_err());
    }

    #[test]
    fn thread_count_bounds() {
        assert!(BlockListConfig::new(4, 4)
            .with_thread_count(0)
            .validate()
            .is_err());
        assert!(BlockListConfig::new(4, 4)
            .with_thread_count(MAX_THREAD_COUNT + 1)
            .validate()
            .is_err());
        assert!(BlockListConfig::new(4, 4)
            .with_thread_count(MAX_THREAD_COUNT)
            .validate()
            .is_ok());
    }

    #[test]
    fn misaligned_element_size_rejected() {
        let mut config = BlockListConfig::new(6, 4);
        config.element_align = 4;
        assert!(config.validate().is_err());
        config.element_align = 3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn overflowing_block_rejected() {
        assert!(BlockListConfig::new(usize::MAX, 2).validate().is_err());
    }

    #[test]
    fn auto_thread_count_in_range() {
        let n = BlockListConfig::default().resolved_thread_count();
        assert!((1..=MAX_THREAD_COUNT).contains(&n));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn blocks_over_four_gib_validate() {
        let config = BlockListConfig::new(1 << 20, 4097).with_thread_count(1);
        let layout = config.validate().unwrap();
        assert_eq!(layout.size(), (1usize << 20) * 4097);
        assert!(layout.size() > u32::MAX as usize);
    }
}
