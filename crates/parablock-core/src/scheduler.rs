//! The scheduling seam used for deferred work.
//!
//! Arenas never own threads. When an arena must run something after a
//! dependency (deferred disposal), it hands a [`Job`] to a [`Scheduler`].
//! The worker pool in `parablock-jobs` implements this trait; the
//! [`DetachedScheduler`] here is the fallback that spawns one thread per
//! job.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crate::error::JobError;
use crate::job::JobHandle;

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs strictly after their dependencies complete.
pub trait Scheduler {
    /// Queue `job` to run once `dependency` has completed.
    ///
    /// Returns a handle that completes after the job has run. Must not
    /// block the caller waiting for `dependency`.
    fn schedule(&self, dependency: JobHandle, job: Job) -> Result<JobHandle, JobError>;
}

impl<S: Scheduler + ?Sized> Scheduler for &S {
    fn schedule(&self, dependency: JobHandle, job: Job) -> Result<JobHandle, JobError> {
        (**self).schedule(dependency, job)
    }
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn schedule(&self, dependency: JobHandle, job: Job) -> Result<JobHandle, JobError> {
        (**self).schedule(dependency, job)
    }
}

/// Spawns a dedicated named thread per job.
///
/// The thread waits for the dependency, runs the job, then completes the
/// returned handle. Suitable for rare work such as disposal; use a worker
/// pool for anything on a hot path.
#[derive(Clone, Debug)]
pub struct DetachedScheduler {
    thread_name: String,
}

impl DetachedScheduler {
    /// Default name given to spawned threads.
    pub const DEFAULT_THREAD_NAME: &'static str = "parablock-deferred";

    /// Create a scheduler whose threads carry the given name.
    pub fn new(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
        }
    }
}

impl Default for DetachedScheduler {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THREAD_NAME)
    }
}

impl Scheduler for DetachedScheduler {
    fn schedule(&self, dependency: JobHandle, job: Job) -> Result<JobHandle, JobError> {
        let (handle, completion) = JobHandle::new();
        thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                dependency.wait();
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::error!("detached job panicked");
                }
                completion.finish();
            })
            .map_err(|e| JobError::SpawnFailed {
                reason: e.to_string(),
            })?;
        Ok(handle)
    }
}
