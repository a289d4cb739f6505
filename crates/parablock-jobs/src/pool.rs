//! Worker pool with dependency-ordered dispatch.
//!
//! Jobs enter through a submit channel to a dispatcher thread. The
//! dispatcher parks jobs whose dependencies are still running and selects
//! over their completion channels; ready jobs go to a shared queue drained
//! by the workers. Each worker runs every job with its own `ThreadIndex`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, RecvError, Select, Sender};
use parablock_core::{Job, JobCompletion, JobError, JobHandle, Scheduler, ThreadIndex};

use crate::config::PoolConfig;

type IndexedJob = Box<dyn FnOnce(ThreadIndex) + Send + 'static>;

struct Pending {
    dependency: JobHandle,
    job: IndexedJob,
    completion: JobCompletion,
}

struct Ready {
    job: IndexedJob,
    completion: JobCompletion,
}

#[derive(Default)]
struct PoolCounters {
    executed: AtomicU64,
    panicked: AtomicU64,
}

/// Fixed-size worker pool owning the thread indices `0..worker_count`.
///
/// Worker `i` is the only thread of this pool that runs jobs with
/// `ThreadIndex(i)`. A job may therefore use its index as the write slot of
/// a per-thread arena whose thread count covers [`worker_count`], provided
/// no other pool or thread writes that arena concurrently.
///
/// Dropping the pool runs every job already scheduled (after its
/// dependencies) and joins all threads.
///
/// [`worker_count`]: WorkerPool::worker_count
pub struct WorkerPool {
    submit_tx: Option<Sender<Pending>>,
    dispatcher: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<PoolCounters>,
    worker_count: usize,
}

impl WorkerPool {
    /// Spawn the dispatcher and `config.resolved_worker_count()` workers.
    pub fn new(config: PoolConfig) -> Result<Self, JobError> {
        let worker_count = config.resolved_worker_count();
        let counters = Arc::new(PoolCounters::default());
        let (submit_tx, submit_rx) = crossbeam_channel::unbounded::<Pending>();
        let (ready_tx, ready_rx) = crossbeam_channel::unbounded::<Ready>();

        let mut workers = Vec::with_capacity(worker_count);
        for i in 0..worker_count {
            let index = ThreadIndex(i as u16);
            let rx = ready_rx.clone();
            let counters = Arc::clone(&counters);
            let spawned = thread::Builder::new()
                .name(format!("{}-{i}", config.thread_name_prefix))
                .spawn(move || worker_loop(index, &rx, &counters));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    drop(ready_tx);
                    return Err(abandon_workers(
                        workers,
                        format!("failed to spawn worker {i}: {e}"),
                    ));
                }
            }
        }
        drop(ready_rx);

        // A failed spawn drops the closure, and with it `ready_tx`, so the
        // workers see a closed queue.
        let dispatcher = match thread::Builder::new()
            .name(format!("{}-dispatch", config.thread_name_prefix))
            .spawn(move || dispatch_loop(&submit_rx, &ready_tx))
        {
            Ok(handle) => handle,
            Err(e) => {
                return Err(abandon_workers(
                    workers,
                    format!("failed to spawn dispatcher: {e}"),
                ))
            }
        };

        tracing::debug!(
            workers = worker_count,
            prefix = %config.thread_name_prefix,
            "worker pool started"
        );

        Ok(Self {
            submit_tx: Some(submit_tx),
            dispatcher: Some(dispatcher),
            workers,
            counters,
            worker_count,
        })
    }

    /// Number of workers, and so the size of the thread-index domain.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Schedule `job` to run on some worker after `dependency` completes.
    ///
    /// The job receives the index of the worker running it. The returned
    /// handle completes when the job returns or panics.
    pub fn schedule_indexed<F>(&self, dependency: JobHandle, job: F) -> Result<JobHandle, JobError>
    where
        F: FnOnce(ThreadIndex) + Send + 'static,
    {
        let tx = self.submit_tx.as_ref().ok_or(JobError::PoolShutDown)?;
        let (handle, completion) = JobHandle::new();
        tx.send(Pending {
            dependency,
            job: Box::new(job),
            completion,
        })
        .map_err(|_| JobError::PoolShutDown)?;
        Ok(handle)
    }

    /// Schedule `job` with no dependency.
    pub fn run<F>(&self, job: F) -> Result<JobHandle, JobError>
    where
        F: FnOnce(ThreadIndex) + Send + 'static,
    {
        self.schedule_indexed(JobHandle::completed(), job)
    }

    /// Run `f(thread, i)` for every `i` in `0..len`, in batches of `batch`
    /// consecutive indices, after `dependency` completes.
    ///
    /// Each batch runs on one worker. The returned handle completes once
    /// every batch has finished. A `batch` of zero is treated as one.
    pub fn parallel_for<F>(
        &self,
        dependency: JobHandle,
        len: usize,
        batch: usize,
        f: F,
    ) -> Result<JobHandle, JobError>
    where
        F: Fn(ThreadIndex, usize) + Send + Sync + 'static,
    {
        let batch = batch.max(1);
        let f = Arc::new(f);
        let mut handles = Vec::with_capacity(len.div_ceil(batch));
        for start in (0..len).step_by(batch) {
            let end = (start + batch).min(len);
            let f = Arc::clone(&f);
            handles.push(self.schedule_indexed(dependency.clone(), move |thread| {
                for i in start..end {
                    f(thread, i);
                }
            })?);
        }
        if handles.is_empty() {
            return Ok(dependency);
        }
        Ok(JobHandle::combine(handles))
    }

    /// Jobs that have finished running, including panicked ones.
    pub fn executed_jobs(&self) -> u64 {
        self.counters.executed.load(Ordering::Acquire)
    }

    /// Jobs that panicked. Their handles still complete.
    pub fn panicked_jobs(&self) -> u64 {
        self.counters.panicked.load(Ordering::Acquire)
    }

    /// Stop accepting jobs, run everything already scheduled, and join all
    /// threads. Idempotent; also called on drop.
    pub fn shutdown(&mut self) {
        let Some(tx) = self.submit_tx.take() else {
            return;
        };
        drop(tx);
        if let Some(dispatcher) = self.dispatcher.take() {
            if dispatcher.join().is_err() {
                tracing::warn!("dispatcher thread panicked");
            }
        }
        for (i, worker) in self.workers.drain(..).enumerate() {
            if worker.join().is_err() {
                tracing::warn!(worker = i, "worker thread panicked");
            }
        }
        tracing::debug!(
            executed = self.executed_jobs(),
            panicked = self.panicked_jobs(),
            "worker pool shut down"
        );
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Scheduler for WorkerPool {
    fn schedule(&self, dependency: JobHandle, job: Job) -> Result<JobHandle, JobError> {
        self.schedule_indexed(dependency, move |_| job())
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("worker_count", &self.worker_count)
            .field("running", &self.submit_tx.is_some())
            .finish()
    }
}

/// Join workers of a pool that failed to start. Their ready queue must
/// already be closed so they exit.
fn abandon_workers(workers: Vec<JoinHandle<()>>, reason: String) -> JobError {
    tracing::warn!(started = workers.len(), %reason, "worker pool failed to start");
    for worker in workers {
        if worker.join().is_err() {
            tracing::warn!("worker thread panicked during startup rollback");
        }
    }
    JobError::SpawnFailed { reason }
}

fn worker_loop(index: ThreadIndex, ready_rx: &Receiver<Ready>, counters: &PoolCounters) {
    tracing::debug!(worker = %index, "worker started");
    while let Ok(Ready { job, completion }) = ready_rx.recv() {
        if panic::catch_unwind(AssertUnwindSafe(|| job(index))).is_err() {
            counters.panicked.fetch_add(1, Ordering::AcqRel);
            tracing::error!(worker = %index, "job panicked");
        }
        counters.executed.fetch_add(1, Ordering::AcqRel);
        completion.finish();
    }
    tracing::debug!(worker = %index, "worker stopped");
}

enum Event {
    Submitted(Result<Pending, RecvError>),
    DependencyDone,
    Recheck,
}

fn dispatch_loop(submit_rx: &Receiver<Pending>, ready_tx: &Sender<Ready>) {
    let mut waiting: Vec<Pending> = Vec::new();
    loop {
        waiting = forward_ready(waiting, ready_tx);

        let event = {
            let pending: Vec<&Receiver<()>> = waiting
                .iter()
                .filter_map(|p| p.dependency.first_pending())
                .collect();
            if pending.len() != waiting.len() {
                // A dependency finished since the last sweep.
                Event::Recheck
            } else {
                let mut sel = Select::new();
                let submit = sel.recv(submit_rx);
                for rx in &pending {
                    sel.recv(rx);
                }
                let oper = sel.select();
                let index = oper.index();
                if index == submit {
                    Event::Submitted(oper.recv(submit_rx))
                } else {
                    // Completion channels never carry messages; this only
                    // observes the disconnect.
                    let _ = oper.recv(pending[index - 1]);
                    Event::DependencyDone
                }
            }
        };

        match event {
            Event::Submitted(Ok(job)) => waiting.push(job),
            Event::Submitted(Err(_)) => break,
            Event::DependencyDone | Event::Recheck => {}
        }
    }

    // Submit side closed: drain parked jobs in arrival order.
    for job in waiting {
        job.dependency.wait();
        forward(job, ready_tx);
    }
}

fn forward_ready(waiting: Vec<Pending>, ready_tx: &Sender<Ready>) -> Vec<Pending> {
    let mut still_waiting = Vec::with_capacity(waiting.len());
    for mut job in waiting {
        if job.dependency.prune() {
            forward(job, ready_tx);
        } else {
            still_waiting.push(job);
        }
    }
    still_waiting
}

fn forward(job: Pending, ready_tx: &Sender<Ready>) {
    let Pending {
        job, completion, ..
    } = job;
    // Workers only exit once this sender is gone, so the send cannot fail
    // while the dispatcher runs; a failure drops the job and completes it.
    if ready_tx.send(Ready { job, completion }).is_err() {
        tracing::warn!("no workers left; dropping ready job");
    }
}
