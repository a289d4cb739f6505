//! Index-based element handles.
//!
//! An [`ElementPtr`] names one record by `(thread, block, offset)` rather
//! than by address. It resolves in O(1) against the list that produced it
//! and stays valid until that list is reset or disposed; further writes
//! never move existing blocks.

use std::fmt;

use parablock_core::ThreadIndex;

/// Location of one record inside a block list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ElementPtr {
    pub(crate) thread: ThreadIndex,
    pub(crate) block: usize,
    pub(crate) offset: usize,
}

impl ElementPtr {
    pub(crate) fn new(thread: ThreadIndex, block: usize, offset: usize) -> Self {
        Self {
            thread,
            block,
            offset,
        }
    }

    /// Thread index whose chain holds the record.
    pub fn thread(&self) -> ThreadIndex {
        self.thread
    }

    /// Block position within the chain, in append order.
    pub fn block(&self) -> usize {
        self.block
    }

    /// Byte offset of the record within its block.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for ElementPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ElementPtr(thread={}, block={}, off={})",
            self.thread, self.block, self.offset
        )
    }
}
