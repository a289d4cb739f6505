//! Per-thread, block-chunked, append-only arena for parallel job output.
//!
//! Many worker threads each append fixed-size records to their own chain
//! of fixed-size blocks without synchronization. Once the workers have
//! joined, a single consumer reads every record back as a contiguous copy,
//! as in-place references or handles, or through a restartable per-thread
//! enumerator.
//!
//! # Architecture
//!
//! ```text
//! RawBlockList (orchestrator)
//! ├── ChainSlot × thread_count (64-byte aligned, one writer each)
//! │   └── Chain → Block[] (fixed-size, zeroed, never moved)
//! └── BlockSource (allocator + fixed block layout)
//!
//! BlockList<T: Pod>  typed view over a RawBlockList
//! ChainWriter        safe exclusive writer for one chain
//! ChainEnumerator    restartable cursor over one chain
//! ```
//!
//! # Readback order
//!
//! Ascending thread index, then blocks in append order, then records in
//! write order. Deterministic, but not a wall-clock order across threads.
//!
//! # Invariant checks
//!
//! Every readback verifies that each chain holds exactly
//! `ceil(records / elements_per_block)` blocks and panics otherwise. The
//! check is always on; a mismatch means a thread index was misused.
//!
//! # Unsafe code
//!
//! Raw pointers are confined to `raw.rs` and the allocator seam. The
//! shared-reference write entry points are `unsafe fn`s whose contract is
//! the scheduler's one-writer-per-thread-index discipline.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::undocumented_unsafe_blocks)]

pub mod alloc;
pub mod block_list;
mod chain;
pub mod config;
pub mod enumerator;
pub mod error;
pub mod handle;
mod raw;
pub mod typed;
pub mod writer;

// Public re-exports for the primary API surface.
pub use alloc::{AllocStats, BlockAllocator, CountingAllocator, Global};
pub use block_list::RawBlockList;
pub use config::BlockListConfig;
pub use enumerator::{ChainEnumerator, ChainIter};
pub use error::BlockListError;
pub use handle::ElementPtr;
pub use typed::{BlockList, TypedWriter};
pub use writer::ChainWriter;
