//! Parablock: a per-thread, block-chunked, append-only arena for parallel
//! job output.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Parablock sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use parablock::prelude::*;
//!
//! let mut list = BlockList::<u32>::with_thread_count(2, 4).unwrap();
//! {
//!     let mut writers = list.writers();
//!     let (a, b) = writers.split_at_mut(1);
//!     a[0].extend([1, 2, 3]);
//!     b[0].extend([10, 20]);
//! }
//! assert_eq!(list.count(), 5);
//! assert_eq!(list.to_vec(), vec![1, 2, 3, 10, 20]);
//! assert_eq!(list.block_count(ThreadIndex(0)), 1);
//!
//! let collected: Vec<u32> = list.iter(ThreadIndex(1)).copied().collect();
//! assert_eq!(collected, vec![10, 20]);
//! list.dispose();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`arena`] | `parablock-arena` | Block lists, enumerators, element handles, allocators |
//! | [`types`] | `parablock-core` | Thread indices, job handles, the `Scheduler` trait |
//! | [`jobs`] | `parablock-jobs` | Worker pool owning a thread-index domain |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Block lists and everything needed to read them back
/// (`parablock-arena`).
pub use parablock_arena as arena;

/// Thread indices, job handles and the scheduler seam (`parablock-core`).
pub use parablock_core as types;

/// Worker pool (`parablock-jobs`).
///
/// [`jobs::WorkerPool`] hands each of its workers a fixed
/// [`types::ThreadIndex`].
pub use parablock_jobs as jobs;

/// Common imports for typical Parablock usage.
pub mod prelude {
    // Arena
    pub use parablock_arena::{
        BlockList, BlockListConfig, ChainEnumerator, ElementPtr, RawBlockList,
    };

    // Errors
    pub use parablock_arena::BlockListError;
    pub use parablock_core::JobError;

    // Jobs
    pub use parablock_core::{JobHandle, Scheduler, ThreadIndex};
    pub use parablock_jobs::{PoolConfig, WorkerPool};
}
