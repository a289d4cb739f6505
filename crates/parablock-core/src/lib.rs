//! Core types for the Parablock workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the arena and the job pool:
//!
//! - [`ThreadIndex`]: the exclusive per-worker slot that selects which
//!   chain of an arena a producer writes to.
//! - [`JobHandle`]: a dependency token that completes when its job finishes.
//! - [`Scheduler`]: anything that can run a job after a dependency, with
//!   [`DetachedScheduler`] as the thread-per-job fallback.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod job;
pub mod scheduler;

pub use error::JobError;
pub use id::{ThreadIndex, MAX_THREAD_COUNT};
pub use job::{JobCompletion, JobHandle};
pub use scheduler::{DetachedScheduler, Job, Scheduler};
