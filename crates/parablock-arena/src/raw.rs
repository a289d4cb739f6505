//! Low-level primitives for block memory.
//!
//! Every raw pointer in the crate originates here. [`Block`] owns one
//! allocation, [`BlockSource`] pairs an allocator with the fixed block
//! layout so blocks are always freed with the layout they were created
//! with, and [`ChainSlot`] is the cache-line aligned cell that lets one
//! writer per thread index mutate its chain through a shared reference.

use std::alloc::Layout;
use std::cell::UnsafeCell;
use std::ptr::NonNull;
use std::slice;

use crate::alloc::BlockAllocator;
use crate::chain::Chain;

/// One fixed-size, zero-initialised block of record storage.
///
/// Blocks never move and are never resized; a pointer into a block stays
/// valid until the block is released.
pub(crate) struct Block {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: a block exclusively owns its allocation; moving it to another
// thread moves that ownership.
unsafe impl Send for Block {}
// SAFETY: shared access only hands out `&[u8]` and raw pointers.
unsafe impl Sync for Block {}

impl Block {
    /// Pointer to the byte at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is not inside the block.
    pub(crate) fn slot(&self, offset: usize) -> NonNull<u8> {
        assert!(offset < self.len, "slot offset {offset} outside block");
        // SAFETY: offset < len, so the result stays inside the allocation
        // and is non-null.
        unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(offset)) }
    }

    /// The whole block as bytes.
    ///
    /// Callers must not hold this across a write to the same block; the
    /// block list's readback contract guarantees no writer is active.
    pub(crate) fn bytes(&self) -> &[u8] {
        // SAFETY: ptr is valid for len initialised (zeroed or written)
        // bytes for as long as the block lives.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

/// Allocator paired with the block layout.
pub(crate) struct BlockSource<A> {
    allocator: A,
    layout: Layout,
}

impl<A: BlockAllocator> BlockSource<A> {
    /// `layout` must have a non-zero size (guaranteed by config validation).
    pub(crate) fn new(allocator: A, layout: Layout) -> Self {
        debug_assert!(layout.size() > 0);
        Self { allocator, layout }
    }

    /// Allocate a fresh zeroed block. Aborts via `handle_alloc_error` if
    /// the allocator fails, keeping writes infallible.
    pub(crate) fn allocate(&self) -> Block {
        match self.allocator.allocate_zeroed(self.layout) {
            Some(ptr) => Block {
                ptr,
                len: self.layout.size(),
            },
            None => std::alloc::handle_alloc_error(self.layout),
        }
    }

    /// Return a block to the allocator.
    pub(crate) fn release(&self, block: Block) {
        debug_assert_eq!(block.len, self.layout.size());
        // SAFETY: blocks are only created by `allocate` on this source, and
        // each list owns exactly one source, so the pointer and layout match.
        unsafe { self.allocator.deallocate(block.ptr, self.layout) }
    }

    pub(crate) fn block_bytes(&self) -> usize {
        self.layout.size()
    }

    pub(crate) fn layout(&self) -> Layout {
        self.layout
    }

    pub(crate) fn allocator(&self) -> &A {
        &self.allocator
    }
}

/// Per-thread chain cell, padded to a cache line.
///
/// 64-byte alignment keeps neighbouring writers from invalidating each
/// other's cursor on every append.
#[repr(align(64))]
pub(crate) struct ChainSlot {
    chain: UnsafeCell<Chain>,
}

// SAFETY: mutable access through `&self` is only available via the unsafe
// `chain_unchecked_mut`, whose callers promise one writer per slot and no
// concurrent readers. `Chain` itself is `Send`.
unsafe impl Sync for ChainSlot {}

impl ChainSlot {
    pub(crate) fn new() -> Self {
        Self {
            chain: UnsafeCell::new(Chain::default()),
        }
    }

    /// Shared view of the chain.
    ///
    /// Sound as long as no writer is active on this slot, which every
    /// unsafe write entry point requires of its caller.
    pub(crate) fn chain(&self) -> &Chain {
        // SAFETY: see above; writers are excluded by contract.
        unsafe { &*self.chain.get() }
    }

    /// Mutable view of the chain through a shared reference.
    ///
    /// # Safety
    ///
    /// The caller must be the only thread accessing this slot for the
    /// lifetime of the returned reference.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn chain_unchecked_mut(&self) -> &mut Chain {
        // SAFETY: exclusivity guaranteed by the caller.
        unsafe { &mut *self.chain.get() }
    }

    pub(crate) fn chain_mut(&mut self) -> &mut Chain {
        self.chain.get_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{CountingAllocator, Global};

    fn source(size: usize) -> BlockSource<CountingAllocator> {
        BlockSource::new(
            CountingAllocator::new(Global),
            Layout::from_size_align(size, 64).unwrap(),
        )
    }

    #[test]
    fn allocated_block_is_zeroed() {
        let source = source(32);
        let block = source.allocate();
        assert_eq!(block.bytes().len(), 32);
        assert!(block.bytes().iter().all(|&b| b == 0));
        source.release(block);
    }

    #[test]
    fn slot_points_inside_block() {
        let source = source(32);
        let block = source.allocate();
        let base = block.bytes().as_ptr() as usize;
        assert_eq!(block.slot(8).as_ptr() as usize, base + 8);
        source.release(block);
    }

    #[test]
    #[should_panic(expected = "outside block")]
    fn slot_past_end_panics() {
        let source = source(32);
        let block = source.allocate();
        let _ = block.slot(32);
    }

    #[test]
    fn release_returns_block() {
        let source = source(16);
        let block = source.allocate();
        assert_eq!(source.allocator.stats().live_blocks, 1);
        source.release(block);
        assert_eq!(source.allocator.stats().live_blocks, 0);
    }

    #[test]
    fn chain_slot_is_cache_line_aligned() {
        assert_eq!(std::mem::align_of::<ChainSlot>(), 64);
        let slots: Vec<ChainSlot> = (0..3).map(|_| ChainSlot::new()).collect();
        let a = &slots[0] as *const ChainSlot as usize;
        let b = &slots[1] as *const ChainSlot as usize;
        assert!(b - a >= 64);
    }
}
