//! Error types for job scheduling.

use std::error::Error;
use std::fmt;

/// Errors raised when a job cannot be scheduled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobError {
    /// A background thread could not be spawned.
    SpawnFailed {
        /// Description of the spawn failure.
        reason: String,
    },
    /// The scheduler has shut down and accepts no more jobs.
    PoolShutDown,
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
            Self::PoolShutDown => write!(f, "scheduler has shut down"),
        }
    }
}

impl Error for JobError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_failed_display_includes_reason() {
        let err = JobError::SpawnFailed {
            reason: "out of threads".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("thread spawn failed"));
        assert!(msg.contains("out of threads"));
    }
}
