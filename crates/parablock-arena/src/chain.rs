//! One thread's private sequence of blocks.

use std::ptr::NonNull;

use smallvec::SmallVec;

use crate::alloc::BlockAllocator;
use crate::raw::{Block, BlockSource};

/// Ordered blocks plus the write cursor for one thread index.
///
/// The cursor is a byte offset into the last block; its upper bound is the
/// block size. Records never straddle blocks because the block size is an
/// exact multiple of the record size.
#[derive(Default)]
pub(crate) struct Chain {
    pub(crate) blocks: SmallVec<[Block; 4]>,
    /// Next free byte in the last block.
    cursor: usize,
    /// Records written to this chain so far.
    pub(crate) element_count: usize,
}

impl Chain {
    /// Claim the next record slot, growing a block if the current one is
    /// full or absent. Returns a pointer to `element_size` bytes.
    pub(crate) fn reserve_slot<A: BlockAllocator>(
        &mut self,
        source: &BlockSource<A>,
        element_size: usize,
    ) -> NonNull<u8> {
        let block_bytes = source.block_bytes();
        if self.blocks.is_empty() || self.cursor + element_size > block_bytes {
            self.blocks.push(source.allocate());
            self.cursor = 0;
            tracing::trace!(
                blocks = self.blocks.len(),
                block_bytes,
                "block list chain grew"
            );
        }
        let offset = self.cursor;
        self.cursor += element_size;
        self.element_count += 1;
        self.blocks[self.blocks.len() - 1].slot(offset)
    }

    /// Free every block and return the chain to its empty state.
    /// Returns the number of blocks released.
    pub(crate) fn release<A: BlockAllocator>(&mut self, source: &BlockSource<A>) -> usize {
        let released = self.blocks.len();
        for block in self.blocks.drain(..) {
            source.release(block);
        }
        self.cursor = 0;
        self.element_count = 0;
        released
    }

    /// Valid records in block `block_index`: full blocks hold
    /// `elements_per_block`, the last holds the remainder.
    pub(crate) fn valid_in_block(&self, block_index: usize, elements_per_block: usize) -> usize {
        self.element_count
            .saturating_sub(block_index.saturating_mul(elements_per_block))
            .min(elements_per_block)
    }

    /// Panic if the block count disagrees with the record count.
    ///
    /// A mismatch means the chain was written under two different thread
    /// identities or reused across passes without a reset.
    pub(crate) fn check_block_count(&self, thread: usize, elements_per_block: usize) {
        let expected = self.element_count.div_ceil(elements_per_block);
        assert_eq!(
            expected,
            self.blocks.len(),
            "block list invariant violated on thread {thread}: {} records need {expected} \
             blocks but {} are allocated (thread index misuse?)",
            self.element_count,
            self.blocks.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{CountingAllocator, Global};
    use std::alloc::Layout;

    fn source(element_size: usize, per_block: usize) -> BlockSource<CountingAllocator> {
        BlockSource::new(
            CountingAllocator::new(Global),
            Layout::from_size_align(element_size * per_block, 64).unwrap(),
        )
    }

    #[test]
    fn first_reserve_allocates_block() {
        let source = source(4, 4);
        let mut chain = Chain::default();
        assert!(chain.blocks.is_empty());
        chain.reserve_slot(&source, 4);
        assert_eq!(chain.blocks.len(), 1);
        assert_eq!(chain.element_count, 1);
        chain.release(&source);
    }

    #[test]
    fn slots_are_contiguous_within_block() {
        let source = source(4, 4);
        let mut chain = Chain::default();
        let a = chain.reserve_slot(&source, 4).as_ptr() as usize;
        let b = chain.reserve_slot(&source, 4).as_ptr() as usize;
        assert_eq!(b - a, 4);
        chain.release(&source);
    }

    #[test]
    fn grows_exactly_when_block_full() {
        let source = source(4, 4);
        let mut chain = Chain::default();
        for _ in 0..4 {
            chain.reserve_slot(&source, 4);
        }
        assert_eq!(chain.blocks.len(), 1);
        chain.reserve_slot(&source, 4);
        assert_eq!(chain.blocks.len(), 2);
        assert_eq!(chain.element_count, 5);
        chain.check_block_count(0, 4);
        chain.release(&source);
    }

    #[test]
    fn valid_in_block_bounds_last_block() {
        let source = source(4, 4);
        let mut chain = Chain::default();
        for _ in 0..6 {
            chain.reserve_slot(&source, 4);
        }
        assert_eq!(chain.valid_in_block(0, 4), 4);
        assert_eq!(chain.valid_in_block(1, 4), 2);
        assert_eq!(chain.valid_in_block(2, 4), 0);
        chain.release(&source);
    }

    #[test]
    fn release_frees_and_resets() {
        let source = source(8, 2);
        let mut chain = Chain::default();
        for _ in 0..5 {
            chain.reserve_slot(&source, 8);
        }
        assert_eq!(chain.release(&source), 3);
        assert_eq!(chain.element_count, 0);
        assert!(chain.blocks.is_empty());
        assert_eq!(source.block_bytes(), 16);
    }

    #[test]
    fn empty_chain_release_is_noop() {
        let source = source(8, 2);
        let mut chain = Chain::default();
        assert_eq!(chain.release(&source), 0);
    }

    #[test]
    #[should_panic(expected = "invariant violated")]
    fn block_count_mismatch_panics() {
        let source = source(4, 4);
        let mut chain = Chain::default();
        chain.reserve_slot(&source, 4);
        chain.element_count = 9;
        chain.check_block_count(0, 4);
    }
}
