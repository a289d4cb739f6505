//! Strongly-typed identifiers.

use std::fmt;

/// Upper bound on the number of concurrent workers a thread-index domain
/// may contain.
///
/// Arenas reject explicit thread counts above it and clamp the
/// auto-detected count (`available_parallelism`) to it; worker pools clamp
/// to it too.
pub const MAX_THREAD_COUNT: usize = 128;

/// Identifies one worker slot within a parallel phase.
///
/// A thread index is handed out by the scheduler that runs the phase. Each
/// index is owned by exactly one worker at a time; arenas rely on that to
/// let producers append to their own chain without synchronization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadIndex(pub u16);

impl ThreadIndex {
    /// The index as a `usize`, for slot lookup.
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ThreadIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for ThreadIndex {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

impl TryFrom<usize> for ThreadIndex {
    type Error = std::num::TryFromIntError;

    fn try_from(v: usize) -> Result<Self, Self::Error> {
        u16::try_from(v).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_bare_number() {
        assert_eq!(ThreadIndex(7).to_string(), "7");
    }

    #[test]
    fn try_from_usize_rejects_overflow() {
        assert_eq!(ThreadIndex::try_from(3usize).unwrap(), ThreadIndex(3));
        assert!(ThreadIndex::try_from(usize::from(u16::MAX) + 1).is_err());
    }

    #[test]
    fn max_thread_count_fits_index() {
        assert!(ThreadIndex::try_from(MAX_THREAD_COUNT - 1).is_ok());
    }
}
