//! Typed view over a block list.
//!
//! [`BlockList<T>`] stores records of a single [`Pod`] type. Pod records
//! have no padding hazards, no drop glue and accept any bit pattern, so
//! bytewise writes and reinterpreting readback are sound. Blocks are
//! aligned to at least `align_of::<T>()` and records are packed at
//! `size_of::<T>()` strides, so every record can be borrowed in place.

use std::marker::PhantomData;

use bytemuck::Pod;
use parablock_core::{JobHandle, Scheduler, ThreadIndex};

use crate::alloc::{BlockAllocator, Global};
use crate::block_list::{thread_index, RawBlockList};
use crate::config::BlockListConfig;
use crate::enumerator::ChainIter;
use crate::error::BlockListError;
use crate::handle::ElementPtr;
use crate::writer::ChainWriter;

/// Per-thread block list of `T` records.
pub struct BlockList<T: Pod, A: BlockAllocator = Global> {
    raw: RawBlockList<A>,
    _marker: PhantomData<T>,
}

impl<T: Pod> BlockList<T, Global> {
    /// Create a list with an auto-detected thread count.
    pub fn new(elements_per_block: usize) -> Result<Self, BlockListError> {
        Self::with_allocator(BlockListConfig::for_type::<T>(elements_per_block), Global)
    }

    /// Create a list with an explicit thread count.
    pub fn with_thread_count(
        thread_count: usize,
        elements_per_block: usize,
    ) -> Result<Self, BlockListError> {
        Self::with_allocator(
            BlockListConfig::for_type::<T>(elements_per_block).with_thread_count(thread_count),
            Global,
        )
    }
}

impl<T: Pod, A: BlockAllocator> BlockList<T, A> {
    /// Create a list from a full config and allocator.
    ///
    /// The config's element size must equal `size_of::<T>()`.
    pub fn with_allocator(config: BlockListConfig, allocator: A) -> Result<Self, BlockListError> {
        RawBlockList::with_allocator(config, allocator)?.into_typed()
    }

    /// The untyped list underneath.
    pub fn raw(&self) -> &RawBlockList<A> {
        &self.raw
    }

    /// Give up the typed view.
    pub fn into_raw(self) -> RawBlockList<A> {
        self.raw
    }

    /// Number of chains.
    pub fn thread_count(&self) -> usize {
        self.raw.thread_count()
    }

    /// Records per block.
    pub fn elements_per_block(&self) -> usize {
        self.raw.elements_per_block()
    }

    /// Append `value` to `thread`'s chain.
    ///
    /// # Safety
    ///
    /// No other thread may write to `thread`'s chain, and no thread may read
    /// from the list, until this call returns.
    pub unsafe fn write(&self, thread: ThreadIndex, value: T) {
        // SAFETY: forwarded contract.
        unsafe { self.raw.write_bytes(thread, bytemuck::bytes_of(&value)) }
    }

    /// Claim a zeroed record in `thread`'s chain for in-place construction.
    ///
    /// # Safety
    ///
    /// Same contract as [`write`](BlockList::write); the returned reference
    /// must be dropped before readback starts.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn allocate(&self, thread: ThreadIndex) -> &mut T {
        // SAFETY: forwarded contract.
        let bytes = unsafe { self.raw.allocate(thread) };
        bytemuck::from_bytes_mut(bytes)
    }

    /// Split into one exclusive typed writer per thread index.
    pub fn writers(&mut self) -> Vec<TypedWriter<'_, T, A>> {
        self.raw
            .writers()
            .into_iter()
            .map(TypedWriter::new)
            .collect()
    }

    /// Exclusive typed writer for a single chain.
    pub fn writer(&mut self, thread: ThreadIndex) -> TypedWriter<'_, T, A> {
        TypedWriter::new(self.raw.writer(thread))
    }

    /// Total records across all chains.
    pub fn count(&self) -> usize {
        self.raw.count()
    }

    /// Whether no record has been written.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Records written to one chain.
    pub fn chain_len(&self, thread: ThreadIndex) -> usize {
        self.raw.chain_len(thread)
    }

    /// Blocks allocated by one chain.
    pub fn block_count(&self, thread: ThreadIndex) -> usize {
        self.raw.block_count(thread)
    }

    /// Blocks allocated across all chains.
    pub fn total_block_count(&self) -> usize {
        self.raw.total_block_count()
    }

    /// Bytes held in blocks across all chains.
    pub fn memory_bytes(&self) -> usize {
        self.raw.memory_bytes()
    }

    /// Copy every record into `dest`, in readback order.
    ///
    /// `dest.len()` must equal [`count`](BlockList::count).
    pub fn copy_values_into(&self, dest: &mut [T]) -> Result<(), BlockListError> {
        let expected = self.count();
        if dest.len() != expected {
            return Err(BlockListError::DestinationLength {
                expected,
                actual: dest.len(),
            });
        }
        self.raw.copy_values_into(bytemuck::cast_slice_mut(dest))
    }

    /// Copy every record into a new vector, in readback order.
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = vec![T::zeroed(); self.count()];
        self.raw.fill_values(bytemuck::cast_slice_mut(&mut out));
        out
    }

    /// Fill `dest` with a handle to every record, in readback order.
    pub fn element_ptrs(&self, dest: &mut [ElementPtr]) -> Result<(), BlockListError> {
        self.raw.element_ptrs(dest)
    }

    /// Borrow every record in place, in readback order.
    pub fn element_refs(&self) -> Vec<&T> {
        let mut out = Vec::with_capacity(self.count());
        out.extend(self.iter_all());
        out
    }

    /// The record `ptr` names, if it is in range.
    pub fn get(&self, ptr: ElementPtr) -> Option<&T> {
        self.raw.resolve(ptr).map(bytemuck::from_bytes)
    }

    /// Restartable iterator over one chain, in write order.
    pub fn iter(&self, thread: ThreadIndex) -> ChainIter<'_, T> {
        ChainIter::new(self.raw.enumerate(thread))
    }

    /// Every record in readback order.
    pub fn iter_all(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.thread_count()).flat_map(move |t| self.iter(thread_index(t)))
    }

    /// Free every block and empty every chain.
    pub fn reset(&mut self) {
        self.raw.reset();
    }

    /// Free every block now.
    pub fn dispose(self) {
        self.raw.dispose();
    }

    /// Free every block once `dependency` completes, on a detached thread.
    pub fn dispose_after(self, dependency: JobHandle) -> Result<JobHandle, BlockListError>
    where
        A: 'static,
    {
        self.raw.dispose_after(dependency)
    }

    /// Free every block once `dependency` completes, on `scheduler`.
    pub fn dispose_after_on<S>(
        self,
        dependency: JobHandle,
        scheduler: &S,
    ) -> Result<JobHandle, BlockListError>
    where
        A: 'static,
        S: Scheduler + ?Sized,
    {
        self.raw.dispose_after_on(dependency, scheduler)
    }
}

impl<A: BlockAllocator> RawBlockList<A> {
    /// View this list as storing `T` records.
    ///
    /// Fails if `T` is not exactly one record in size, or needs stronger
    /// alignment than the blocks provide.
    pub fn into_typed<T: Pod>(self) -> Result<BlockList<T, A>, BlockListError> {
        let size = std::mem::size_of::<T>();
        if size != self.element_size() {
            return Err(BlockListError::ElementSizeMismatch {
                expected: self.element_size(),
                actual: size,
            });
        }
        let align = std::mem::align_of::<T>();
        if align > self.block_align() {
            return Err(BlockListError::InvalidConfig {
                reason: format!(
                    "record alignment {align} exceeds block alignment {}",
                    self.block_align()
                ),
            });
        }
        Ok(BlockList {
            raw: self,
            _marker: PhantomData,
        })
    }
}

/// Exclusive typed writer for one chain of a [`BlockList`].
pub struct TypedWriter<'a, T: Pod, A: BlockAllocator = Global> {
    inner: ChainWriter<'a, A>,
    _marker: PhantomData<fn(T)>,
}

impl<'a, T: Pod, A: BlockAllocator> TypedWriter<'a, T, A> {
    fn new(inner: ChainWriter<'a, A>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Thread index of the chain this writer appends to.
    pub fn thread(&self) -> ThreadIndex {
        self.inner.thread()
    }

    /// Records in this chain so far.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether this chain holds no records.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Append one record.
    pub fn write(&mut self, value: T) {
        self.inner.write_bytes(bytemuck::bytes_of(&value));
    }

    /// Claim a zeroed record for in-place construction.
    pub fn allocate(&mut self) -> &mut T {
        bytemuck::from_bytes_mut(self.inner.allocate())
    }
}

impl<T: Pod, A: BlockAllocator> Extend<T> for TypedWriter<'_, T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.write(value);
        }
    }
}
