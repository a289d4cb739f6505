//! Worker pool configuration.

use parablock_core::MAX_THREAD_COUNT;

/// Configuration for a [`WorkerPool`](crate::WorkerPool).
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of worker threads. `None` = auto-detect
    /// (`available_parallelism`, clamped to `[1, MAX_THREAD_COUNT]`).
    pub worker_count: Option<usize>,
    /// Prefix for worker thread names. Workers are named
    /// `{prefix}-{index}`, the dispatcher `{prefix}-dispatch`.
    pub thread_name_prefix: String,
}

impl PoolConfig {
    /// Default thread name prefix.
    pub const DEFAULT_THREAD_NAME_PREFIX: &'static str = "parablock-worker";

    /// Config with an explicit worker count.
    pub fn with_workers(worker_count: usize) -> Self {
        Self {
            worker_count: Some(worker_count),
            ..Self::default()
        }
    }

    /// Resolve the actual worker count, applying auto-detection if `None`.
    ///
    /// Explicit values are clamped to `[1, MAX_THREAD_COUNT]`. Zero workers
    /// would leave every scheduled job waiting forever.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, MAX_THREAD_COUNT),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .clamp(1, MAX_THREAD_COUNT),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: None,
            thread_name_prefix: Self::DEFAULT_THREAD_NAME_PREFIX.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_count_clamped() {
        assert_eq!(PoolConfig::with_workers(0).resolved_worker_count(), 1);
        assert_eq!(PoolConfig::with_workers(3).resolved_worker_count(), 3);
        assert_eq!(
            PoolConfig::with_workers(10_000).resolved_worker_count(),
            MAX_THREAD_COUNT
        );
    }

    #[test]
    fn auto_count_in_range() {
        let n = PoolConfig::default().resolved_worker_count();
        assert!((1..=MAX_THREAD_COUNT).contains(&n));
    }
}
