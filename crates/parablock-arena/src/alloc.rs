//! Block allocators.
//!
//! A block list obtains every block from a [`BlockAllocator`] and returns
//! it to the same allocator at disposal. [`Global`] forwards to the process
//! allocator; [`CountingAllocator`] wraps another allocator and tracks live
//! blocks so tests and diagnostics can confirm that disposal frees
//! everything.

use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Source of zero-initialised blocks.
///
/// # Safety
///
/// Implementations must return pointers that are valid for reads and
/// writes of `layout.size()` bytes, aligned to `layout.align()`,
/// zero-initialised, and not aliased by any other allocation until passed
/// back to [`deallocate`](BlockAllocator::deallocate).
pub unsafe trait BlockAllocator: Send + Sync {
    /// Allocate a zeroed block. `None` signals allocation failure.
    fn allocate_zeroed(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Return a block to the allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate_zeroed` on this allocator
    /// with the same `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The process-wide allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct Global;

// SAFETY: forwards to `std::alloc`, which upholds the trait contract for
// non-zero-sized layouts. Zero-sized layouts are refused.
unsafe impl BlockAllocator for Global {
    fn allocate_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return None;
        }
        // SAFETY: layout has a non-zero size.
        NonNull::new(unsafe { alloc::alloc_zeroed(layout) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: the caller guarantees `ptr` came from `alloc_zeroed`
        // with this layout.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

/// Point-in-time counters from a [`CountingAllocator`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Blocks currently allocated and not yet freed.
    pub live_blocks: usize,
    /// Bytes currently allocated and not yet freed.
    pub live_bytes: usize,
    /// Blocks allocated over the allocator's lifetime.
    pub total_allocations: usize,
    /// Blocks freed over the allocator's lifetime.
    pub total_deallocations: usize,
}

#[derive(Debug, Default)]
struct Counters {
    live_blocks: AtomicUsize,
    live_bytes: AtomicUsize,
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
}

/// Allocator wrapper that counts blocks.
///
/// Clones share counters, so a test can keep one clone and hand the other
/// to a block list, then inspect [`stats`](CountingAllocator::stats) after
/// the list is gone.
#[derive(Clone, Debug, Default)]
pub struct CountingAllocator<A = Global> {
    inner: A,
    counters: Arc<Counters>,
}

impl<A> CountingAllocator<A> {
    /// Wrap `inner`.
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Snapshot the counters.
    pub fn stats(&self) -> AllocStats {
        AllocStats {
            live_blocks: self.counters.live_blocks.load(Ordering::Acquire),
            live_bytes: self.counters.live_bytes.load(Ordering::Acquire),
            total_allocations: self.counters.allocations.load(Ordering::Acquire),
            total_deallocations: self.counters.deallocations.load(Ordering::Acquire),
        }
    }
}

// SAFETY: every pointer comes straight from `inner`, which upholds the
// contract; counting does not touch the memory.
unsafe impl<A: BlockAllocator> BlockAllocator for CountingAllocator<A> {
    fn allocate_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        let ptr = self.inner.allocate_zeroed(layout)?;
        self.counters.live_blocks.fetch_add(1, Ordering::AcqRel);
        self.counters
            .live_bytes
            .fetch_add(layout.size(), Ordering::AcqRel);
        self.counters.allocations.fetch_add(1, Ordering::AcqRel);
        Some(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded contract; `ptr` came from `inner`.
        unsafe { self.inner.deallocate(ptr, layout) };
        self.counters.live_blocks.fetch_sub(1, Ordering::AcqRel);
        self.counters
            .live_bytes
            .fetch_sub(layout.size(), Ordering::AcqRel);
        self.counters.deallocations.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_refuses_zero_size() {
        let layout = Layout::from_size_align(0, 64).unwrap();
        assert!(Global.allocate_zeroed(layout).is_none());
    }

    #[test]
    fn global_block_is_zeroed_and_aligned() {
        let layout = Layout::from_size_align(256, 64).unwrap();
        let ptr = Global.allocate_zeroed(layout).unwrap();
        assert_eq!(ptr.as_ptr() as usize % 64, 0);
        // SAFETY: freshly allocated, 256 bytes, zeroed.
        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 256) };
        assert!(bytes.iter().all(|&b| b == 0));
        // SAFETY: allocated above with the same layout.
        unsafe { Global.deallocate(ptr, layout) };
    }

    #[test]
    fn counting_tracks_live_blocks() {
        let counting = CountingAllocator::new(Global);
        let observer = counting.clone();
        let layout = Layout::from_size_align(128, 64).unwrap();

        let a = counting.allocate_zeroed(layout).unwrap();
        let b = counting.allocate_zeroed(layout).unwrap();
        assert_eq!(observer.stats().live_blocks, 2);
        assert_eq!(observer.stats().live_bytes, 256);

        // SAFETY: both came from `counting` with `layout`.
        unsafe {
            counting.deallocate(a, layout);
            counting.deallocate(b, layout);
        }
        assert_eq!(
            observer.stats(),
            AllocStats {
                live_blocks: 0,
                live_bytes: 0,
                total_allocations: 2,
                total_deallocations: 2,
            }
        );
    }
}
