//! The untyped per-thread block list.
//!
//! [`RawBlockList`] owns one chain per thread index. Producers append
//! fixed-size records to their own chain with no synchronization; a
//! single consumer reads everything back once producers have joined.
//!
//! # Write paths
//!
//! - [`writers`](RawBlockList::writers) splits the list into one
//!   [`ChainWriter`] per thread index. The borrow checker enforces the
//!   one-writer-per-chain rule, so this path is safe.
//! - [`write_bytes`](RawBlockList::write_bytes) and
//!   [`allocate`](RawBlockList::allocate) take `&self` for producers that
//!   share the list (a worker pool holding an `Arc`). They are `unsafe`:
//!   the caller promises that its thread index is exclusively its own for
//!   the duration of the parallel phase, and that nobody reads the list
//!   while any producer is active.
//!
//! # Readback order
//!
//! Every bulk read walks chains in ascending thread index, then blocks in
//! append order, then records within a block. The order is deterministic
//! but says nothing about wall-clock order across threads.

use std::ptr;
use std::slice;

use parablock_core::{DetachedScheduler, JobHandle, Scheduler, ThreadIndex};

use crate::alloc::{BlockAllocator, Global};
use crate::config::BlockListConfig;
use crate::enumerator::ChainEnumerator;
use crate::error::BlockListError;
use crate::handle::ElementPtr;
use crate::raw::{Block, BlockSource, ChainSlot};
use crate::writer::ChainWriter;

/// Per-thread, block-chunked, append-only arena of fixed-size records.
pub struct RawBlockList<A: BlockAllocator = Global> {
    slots: Box<[ChainSlot]>,
    source: BlockSource<A>,
    element_size: usize,
    elements_per_block: usize,
}

// Compile-time assertion: producers on several threads share `&RawBlockList`.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<RawBlockList>();
};

impl RawBlockList<Global> {
    /// Create a list backed by the process allocator.
    pub fn new(config: BlockListConfig) -> Result<Self, BlockListError> {
        Self::with_allocator(config, Global)
    }
}

impl<A: BlockAllocator> RawBlockList<A> {
    /// Create a list that draws blocks from `allocator`.
    ///
    /// Validates `config` and allocates the chain array. No blocks are
    /// allocated until the first write to each chain.
    pub fn with_allocator(config: BlockListConfig, allocator: A) -> Result<Self, BlockListError> {
        let layout = config.validate()?;
        let thread_count = config.resolved_thread_count();
        let slots: Box<[ChainSlot]> = (0..thread_count).map(|_| ChainSlot::new()).collect();
        tracing::debug!(
            element_size = config.element_size,
            elements_per_block = config.elements_per_block,
            thread_count,
            block_bytes = layout.size(),
            "block list created"
        );
        Ok(Self {
            slots,
            source: BlockSource::new(allocator, layout),
            element_size: config.element_size,
            elements_per_block: config.elements_per_block,
        })
    }

    /// Size of one record in bytes.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Records per block.
    pub fn elements_per_block(&self) -> usize {
        self.elements_per_block
    }

    /// Number of chains, i.e. the size of the thread-index domain.
    pub fn thread_count(&self) -> usize {
        self.slots.len()
    }

    /// Size of one block in bytes.
    pub fn block_bytes(&self) -> usize {
        self.source.block_bytes()
    }

    /// Alignment of every block (and therefore of the first record in it).
    pub fn block_align(&self) -> usize {
        self.source.layout().align()
    }

    /// The allocator blocks are drawn from.
    pub fn allocator(&self) -> &A {
        self.source.allocator()
    }

    fn slot(&self, thread: ThreadIndex) -> &ChainSlot {
        match self.slots.get(thread.get()) {
            Some(slot) => slot,
            None => panic!(
                "thread index {thread} out of range for a list with {} chains",
                self.slots.len()
            ),
        }
    }

    /// Append one record to `thread`'s chain.
    ///
    /// # Panics
    ///
    /// Panics if `thread` is out of range or `bytes` is not exactly
    /// [`element_size`](RawBlockList::element_size) long.
    ///
    /// # Safety
    ///
    /// No other thread may write to `thread`'s chain, and no thread may read
    /// from the list, until this call returns.
    pub unsafe fn write_bytes(&self, thread: ThreadIndex, bytes: &[u8]) {
        assert_eq!(
            bytes.len(),
            self.element_size,
            "record must be exactly {} bytes",
            self.element_size
        );
        // SAFETY: exclusivity of this chain is the caller's contract.
        let chain = unsafe { self.slot(thread).chain_unchecked_mut() };
        let dst = chain.reserve_slot(&self.source, self.element_size);
        // SAFETY: `dst` addresses `element_size` bytes of a live block that
        // were never handed out before, so they cannot overlap `bytes`.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), dst.as_ptr(), self.element_size) };
    }

    /// Claim one zeroed record slot in `thread`'s chain for in-place
    /// construction. The slot counts towards [`count`](RawBlockList::count)
    /// immediately.
    ///
    /// # Panics
    ///
    /// Panics if `thread` is out of range.
    ///
    /// # Safety
    ///
    /// Same contract as [`write_bytes`](RawBlockList::write_bytes). In
    /// addition, the returned slice must be dropped before readback starts.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn allocate(&self, thread: ThreadIndex) -> &mut [u8] {
        // SAFETY: exclusivity of this chain is the caller's contract.
        let chain = unsafe { self.slot(thread).chain_unchecked_mut() };
        let dst = chain.reserve_slot(&self.source, self.element_size);
        // SAFETY: fresh, zeroed, in-bounds bytes that no other reference
        // covers; blocks never move while the list is alive.
        unsafe { slice::from_raw_parts_mut(dst.as_ptr(), self.element_size) }
    }

    /// Split the list into one exclusive writer per thread index.
    ///
    /// Writer `i` appends to chain `i`. Writers are `Send`, so they can be
    /// moved into scoped threads.
    pub fn writers(&mut self) -> Vec<ChainWriter<'_, A>> {
        let source = &self.source;
        let element_size = self.element_size;
        self.slots
            .iter_mut()
            .enumerate()
            .map(|(t, slot)| ChainWriter::new(thread_index(t), slot.chain_mut(), source, element_size))
            .collect()
    }

    /// Exclusive writer for a single chain.
    ///
    /// # Panics
    ///
    /// Panics if `thread` is out of range.
    pub fn writer(&mut self, thread: ThreadIndex) -> ChainWriter<'_, A> {
        let count = self.slots.len();
        let slot = match self.slots.get_mut(thread.get()) {
            Some(slot) => slot,
            None => panic!("thread index {thread} out of range for a list with {count} chains"),
        };
        ChainWriter::new(thread, slot.chain_mut(), &self.source, self.element_size)
    }

    /// Total records across all chains.
    pub fn count(&self) -> usize {
        self.slots.iter().map(|s| s.chain().element_count).sum()
    }

    /// Whether no record has been written.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Records written to one chain.
    pub fn chain_len(&self, thread: ThreadIndex) -> usize {
        self.slot(thread).chain().element_count
    }

    /// Blocks allocated by one chain.
    pub fn block_count(&self, thread: ThreadIndex) -> usize {
        self.slot(thread).chain().blocks.len()
    }

    /// Blocks allocated across all chains.
    pub fn total_block_count(&self) -> usize {
        self.slots.iter().map(|s| s.chain().blocks.len()).sum()
    }

    /// Bytes held in blocks across all chains.
    pub fn memory_bytes(&self) -> usize {
        self.total_block_count() * self.block_bytes()
    }

    /// Visit every block in readback order with its valid record count.
    ///
    /// Checks the block-count invariant of each chain first.
    fn for_each_block(&self, mut f: impl FnMut(ThreadIndex, usize, &Block, usize)) {
        for (t, slot) in self.slots.iter().enumerate() {
            let chain = slot.chain();
            chain.check_block_count(t, self.elements_per_block);
            for (b, block) in chain.blocks.iter().enumerate() {
                f(
                    thread_index(t),
                    b,
                    block,
                    chain.valid_in_block(b, self.elements_per_block),
                );
            }
        }
    }

    fn check_len(&self, expected: usize, actual: usize) -> Result<(), BlockListError> {
        if expected == actual {
            Ok(())
        } else {
            Err(BlockListError::DestinationLength { expected, actual })
        }
    }

    /// Fill `dest` with a handle to every record, in readback order.
    ///
    /// `dest.len()` must equal [`count`](RawBlockList::count).
    pub fn element_ptrs(&self, dest: &mut [ElementPtr]) -> Result<(), BlockListError> {
        self.check_len(self.count(), dest.len())?;
        let mut out = dest.iter_mut();
        let element_size = self.element_size;
        self.for_each_block(|thread, b, _block, valid| {
            for (i, slot) in out.by_ref().take(valid).enumerate() {
                *slot = ElementPtr::new(thread, b, i * element_size);
            }
        });
        Ok(())
    }

    /// Fill `dest` with the address of every record, in readback order.
    ///
    /// Addresses stay valid until the list is reset or disposed. Pair with
    /// [`dispose_after`](RawBlockList::dispose_after) when a deferred
    /// consumer holds them.
    pub fn raw_element_ptrs(&self, dest: &mut [*const u8]) -> Result<(), BlockListError> {
        self.check_len(self.count(), dest.len())?;
        let mut out = dest.iter_mut();
        let element_size = self.element_size;
        self.for_each_block(|_, _, block, valid| {
            for (i, slot) in out.by_ref().take(valid).enumerate() {
                *slot = block.slot(i * element_size).as_ptr().cast_const();
            }
        });
        Ok(())
    }

    /// Copy every record into `dest`, in readback order.
    ///
    /// `dest.len()` must equal `count() * element_size()` bytes.
    pub fn copy_values_into(&self, dest: &mut [u8]) -> Result<(), BlockListError> {
        self.check_len(self.count() * self.element_size, dest.len())?;
        self.fill_values(dest);
        Ok(())
    }

    /// Copy every record into a new contiguous buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.count() * self.element_size];
        self.fill_values(&mut out);
        out
    }

    /// Copy every record into `dest`, whose length the caller has sized to
    /// `count() * element_size()`.
    pub(crate) fn fill_values(&self, dest: &mut [u8]) {
        let mut written = 0;
        let element_size = self.element_size;
        self.for_each_block(|_, _, block, valid| {
            let bytes = valid * element_size;
            dest[written..written + bytes].copy_from_slice(&block.bytes()[..bytes]);
            written += bytes;
        });
    }

    /// The bytes of the record `ptr` names, if it is in range.
    pub fn resolve(&self, ptr: ElementPtr) -> Option<&[u8]> {
        let chain = self.slots.get(ptr.thread().get())?.chain();
        let block = chain.blocks.get(ptr.block())?;
        let valid = chain.valid_in_block(ptr.block(), self.elements_per_block) * self.element_size;
        let end = ptr.offset().checked_add(self.element_size)?;
        if ptr.offset() % self.element_size != 0 || end > valid {
            return None;
        }
        Some(&block.bytes()[ptr.offset()..end])
    }

    /// Restartable cursor over one chain.
    ///
    /// # Panics
    ///
    /// Panics if `thread` is out of range.
    pub fn enumerate(&self, thread: ThreadIndex) -> ChainEnumerator<'_> {
        let chain = self.slot(thread).chain();
        chain.check_block_count(thread.get(), self.elements_per_block);
        ChainEnumerator::new(chain, self.element_size, self.elements_per_block)
    }

    /// Every record in readback order, as byte slices.
    pub fn enumerate_all(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.slots.len()).flat_map(move |t| self.enumerate(thread_index(t)))
    }

    /// Free every block and empty every chain, keeping the configuration.
    ///
    /// This is how a list is reused across logical passes.
    pub fn reset(&mut self) {
        let released = self.release_all();
        tracing::debug!(blocks = released, "block list reset");
    }

    fn release_all(&mut self) -> usize {
        let source = &self.source;
        self.slots
            .iter_mut()
            .map(|slot| slot.chain_mut().release(source))
            .sum()
    }

    /// Free every block now. Equivalent to dropping the list.
    pub fn dispose(self) {
        drop(self);
    }

    /// Free every block once `dependency` completes, on a detached thread.
    ///
    /// Returns immediately with a handle that completes after the blocks
    /// are freed.
    pub fn dispose_after(self, dependency: JobHandle) -> Result<JobHandle, BlockListError>
    where
        A: 'static,
    {
        self.dispose_after_on(dependency, &DetachedScheduler::default())
    }

    /// Free every block once `dependency` completes, on `scheduler`.
    ///
    /// If the scheduler refuses the job, the list is still never freed
    /// before `dependency` completes: the calling thread waits for it, frees
    /// the blocks, and the scheduler error is returned.
    pub fn dispose_after_on<S>(
        self,
        dependency: JobHandle,
        scheduler: &S,
    ) -> Result<JobHandle, BlockListError>
    where
        A: 'static,
        S: Scheduler + ?Sized,
    {
        let guard = DeferredDisposal {
            dependency: dependency.clone(),
            _list: self,
        };
        let handle = scheduler.schedule(dependency, Box::new(move || drop(guard)))?;
        Ok(handle)
    }
}

impl<A: BlockAllocator> Drop for RawBlockList<A> {
    fn drop(&mut self) {
        let released = self.release_all();
        tracing::debug!(
            blocks = released,
            bytes = released * self.block_bytes(),
            "block list disposed"
        );
    }
}

/// Owns a list until its dependency completes.
///
/// The wait lives in `Drop` so the ordering holds on every path, including
/// a scheduler that drops the job without running it.
struct DeferredDisposal<A: BlockAllocator> {
    dependency: JobHandle,
    _list: RawBlockList<A>,
}

impl<A: BlockAllocator> Drop for DeferredDisposal<A> {
    fn drop(&mut self) {
        self.dependency.wait();
    }
}

pub(crate) fn thread_index(t: usize) -> ThreadIndex {
    // Thread counts are capped at MAX_THREAD_COUNT by config validation.
    ThreadIndex(t as u16)
}
