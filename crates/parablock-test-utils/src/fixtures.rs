//! Mock schedulers for exercising deferred disposal.
//!
//! - [`InlineScheduler`] waits for the dependency and runs the job on the
//!   calling thread.
//! - [`RefusingScheduler`] rejects every job.
//! - [`RecordingScheduler`] queues jobs until the test runs them by hand.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use parablock_core::{Job, JobCompletion, JobError, JobHandle, Scheduler};

/// Runs each job synchronously once its dependency completes.
#[derive(Default)]
pub struct InlineScheduler {
    scheduled: AtomicUsize,
}

impl InlineScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheduled(&self) -> usize {
        self.scheduled.load(Ordering::SeqCst)
    }
}

impl Scheduler for InlineScheduler {
    fn schedule(&self, dependency: JobHandle, job: Job) -> Result<JobHandle, JobError> {
        self.scheduled.fetch_add(1, Ordering::SeqCst);
        dependency.wait();
        job();
        Ok(JobHandle::completed())
    }
}

/// Rejects every job with [`JobError::SpawnFailed`].
#[derive(Default)]
pub struct RefusingScheduler;

impl Scheduler for RefusingScheduler {
    fn schedule(&self, _dependency: JobHandle, _job: Job) -> Result<JobHandle, JobError> {
        Err(JobError::SpawnFailed {
            reason: "refused by test scheduler".into(),
        })
    }
}

/// Holds jobs until [`run_all`](RecordingScheduler::run_all) is called.
#[derive(Default)]
pub struct RecordingScheduler {
    queue: Mutex<Vec<(JobHandle, Job, JobCompletion)>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Run every queued job in order, waiting on each dependency first.
    pub fn run_all(&self) {
        let jobs = std::mem::take(&mut *self.queue.lock().unwrap());
        for (dependency, job, completion) in jobs {
            dependency.wait();
            job();
            completion.finish();
        }
    }
}

impl Scheduler for RecordingScheduler {
    fn schedule(&self, dependency: JobHandle, job: Job) -> Result<JobHandle, JobError> {
        let (handle, completion) = JobHandle::new();
        self.queue.lock().unwrap().push((dependency, job, completion));
        Ok(handle)
    }
}
