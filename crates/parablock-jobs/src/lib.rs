//! Fork-join worker pool for Parablock.
//!
//! [`WorkerPool`] stands in for a host job system: it owns a fixed domain
//! of thread indices (worker `i` runs every job it picks up with
//! `ThreadIndex(i)`), runs jobs strictly after their dependencies, and
//! returns a [`JobHandle`](parablock_core::JobHandle) for each.
//!
//! ```text
//! schedule ──► dispatcher (Select over pending dependencies)
//!                 │ ready
//!                 ▼
//!              shared queue ──► worker 0 … worker N-1
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod pool;

pub use config::PoolConfig;
pub use pool::WorkerPool;
