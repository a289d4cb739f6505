//! Benchmark profiles for the Parablock arena.
//!
//! - [`reference_profile`]: 8 threads × 4K records, 256 records per block
//! - [`stress_profile`]: 32 threads × 32K records, 1024 records per block
//! - [`filled_list`]: a list pre-populated from a profile

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use parablock_arena::{BlockList, BlockListError};
use parablock_test_utils::{fill_parallel, Sample};

/// Shape of a benchmark workload.
#[derive(Clone, Debug)]
pub struct BenchProfile {
    /// Chains in the list.
    pub threads: usize,
    /// Records each chain receives.
    pub records_per_thread: usize,
    /// Block size in records.
    pub elements_per_block: usize,
}

impl BenchProfile {
    /// Per-thread write plan for this profile.
    pub fn plan(&self) -> Vec<usize> {
        vec![self.records_per_thread; self.threads]
    }

    /// Total records written.
    pub fn total(&self) -> usize {
        self.threads * self.records_per_thread
    }

    /// An empty list shaped for this profile.
    pub fn empty_list(&self) -> Result<BlockList<Sample>, BlockListError> {
        BlockList::with_thread_count(self.threads, self.elements_per_block)
    }
}

/// Moderate workload resembling one frame of job output.
pub fn reference_profile() -> BenchProfile {
    BenchProfile {
        threads: 8,
        records_per_thread: 4096,
        elements_per_block: 256,
    }
}

/// Large workload for stress testing.
pub fn stress_profile() -> BenchProfile {
    BenchProfile {
        threads: 32,
        records_per_thread: 32 * 1024,
        elements_per_block: 1024,
    }
}

/// Build a list and fill it from the profile's plan on scoped threads.
pub fn filled_list(profile: &BenchProfile) -> Result<BlockList<Sample>, BlockListError> {
    let mut list = profile.empty_list()?;
    fill_parallel(&mut list, &profile.plan());
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_profile_fills_completely() {
        let profile = reference_profile();
        let list = filled_list(&profile).unwrap();
        assert_eq!(list.count(), profile.total());
        assert_eq!(list.total_block_count(), profile.threads * 16);
    }
}
