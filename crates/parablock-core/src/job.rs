//! Dependency tokens for deferred work.
//!
//! A [`JobHandle`] is the receiving side of one or more zero-capacity
//! crossbeam channels. Nothing is ever sent on them: a job signals
//! completion by dropping its [`JobCompletion`], which disconnects the
//! channel. Disconnection is observable from any number of cloned
//! handles and publishes a happens-before edge, so everything the job
//! wrote is visible to whoever observed its completion.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use smallvec::SmallVec;

/// Token representing the completion of zero or more jobs.
///
/// Cheap to clone. A handle with no pending jobs is already complete.
/// Combine handles with [`JobHandle::combine`] to depend on several jobs
/// at once.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct JobHandle {
    pending: SmallVec<[Receiver<()>; 2]>,
}

/// Completion side of a [`JobHandle`].
///
/// Dropping it (or calling [`finish`](JobCompletion::finish)) completes
/// the paired handle. Dropping during a panic unwind also completes it, so
/// dependents are never stranded behind a failed job.
#[derive(Debug)]
pub struct JobCompletion {
    _signal: Sender<()>,
}

impl JobCompletion {
    /// Mark the job as finished.
    pub fn finish(self) {}
}

impl JobHandle {
    /// Create a pending handle and the completion that resolves it.
    pub fn new() -> (Self, JobCompletion) {
        let (tx, rx) = crossbeam_channel::bounded(0);
        let mut pending = SmallVec::new();
        pending.push(rx);
        (Self { pending }, JobCompletion { _signal: tx })
    }

    /// A handle that is already complete.
    pub fn completed() -> Self {
        Self {
            pending: SmallVec::new(),
        }
    }

    /// Merge several handles into one that completes when all of them have.
    pub fn combine<I>(handles: I) -> Self
    where
        I: IntoIterator<Item = JobHandle>,
    {
        let mut pending = SmallVec::new();
        for handle in handles {
            pending.extend(handle.pending.into_iter().filter(|rx| !is_done(rx)));
        }
        Self { pending }
    }

    /// Whether every job behind this handle has finished. Never blocks.
    pub fn is_completed(&self) -> bool {
        self.pending.iter().all(is_done)
    }

    /// Block the calling thread until every job behind this handle has
    /// finished.
    pub fn wait(&self) {
        for rx in &self.pending {
            while rx.recv().is_ok() {}
        }
    }

    /// Drop receivers whose jobs have finished. Returns `true` when the
    /// handle is complete.
    pub fn prune(&mut self) -> bool {
        self.pending.retain(|rx| !is_done(rx));
        self.pending.is_empty()
    }

    /// A receiver for one still-running job, if any.
    ///
    /// The receiver disconnects when that job finishes; schedulers register
    /// it with a `crossbeam_channel::Select` to wait on many handles at once.
    pub fn first_pending(&self) -> Option<&Receiver<()>> {
        self.pending.iter().find(|rx| !is_done(rx))
    }

    /// Number of jobs this handle still tracks (finished ones included until
    /// the next [`prune`](JobHandle::prune)).
    pub fn tracked_jobs(&self) -> usize {
        self.pending.len()
    }
}

fn is_done(rx: &Receiver<()>) -> bool {
    matches!(rx.try_recv(), Err(TryRecvError::Disconnected))
}
