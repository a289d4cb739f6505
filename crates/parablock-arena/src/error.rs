//! Block list error types.

use std::error::Error;
use std::fmt;

use parablock_core::JobError;

/// Errors that can occur during block list operations.
///
/// Only configuration and caller-sized buffers produce errors. Invariant
/// violations (a chain holding the wrong number of blocks for its record
/// count) are programming errors and panic instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockListError {
    /// The configuration violates an invariant.
    InvalidConfig {
        /// Which invariant was violated.
        reason: String,
    },
    /// A record type does not match the list's element size or alignment.
    ElementSizeMismatch {
        /// Element size of the list in bytes.
        expected: usize,
        /// Size of the offered record type in bytes.
        actual: usize,
    },
    /// A readback destination does not match the number of records.
    DestinationLength {
        /// Required destination length.
        expected: usize,
        /// Length of the destination provided.
        actual: usize,
    },
    /// Deferred disposal could not be scheduled.
    Job(JobError),
}

impl fmt::Display for BlockListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid block list config: {reason}"),
            Self::ElementSizeMismatch { expected, actual } => {
                write!(
                    f,
                    "element size mismatch: list stores {expected}-byte records, got {actual}"
                )
            }
            Self::DestinationLength { expected, actual } => {
                write!(
                    f,
                    "destination length mismatch: expected {expected}, got {actual}"
                )
            }
            Self::Job(e) => write!(f, "deferred disposal: {e}"),
        }
    }
}

impl Error for BlockListError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Job(e) => Some(e),
            _ => None,
        }
    }
}

impl From<JobError> for BlockListError {
    fn from(e: JobError) -> Self {
        Self::Job(e)
    }
}
