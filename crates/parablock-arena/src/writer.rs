//! Exclusive per-chain writers.

use std::ptr;
use std::slice;

use bytemuck::Pod;
use parablock_core::ThreadIndex;

use crate::alloc::{BlockAllocator, Global};
use crate::chain::Chain;
use crate::raw::BlockSource;

/// Safe, exclusive write access to one chain.
///
/// Obtained from [`RawBlockList::writers`](crate::RawBlockList::writers) or
/// [`RawBlockList::writer`](crate::RawBlockList::writer). Holding the writer
/// mutably borrows the list, so no reader can observe a half-written chain.
pub struct ChainWriter<'a, A: BlockAllocator = Global> {
    thread: ThreadIndex,
    chain: &'a mut Chain,
    source: &'a BlockSource<A>,
    element_size: usize,
}

impl<'a, A: BlockAllocator> ChainWriter<'a, A> {
    pub(crate) fn new(
        thread: ThreadIndex,
        chain: &'a mut Chain,
        source: &'a BlockSource<A>,
        element_size: usize,
    ) -> Self {
        Self {
            thread,
            chain,
            source,
            element_size,
        }
    }

    /// Thread index of the chain this writer appends to.
    pub fn thread(&self) -> ThreadIndex {
        self.thread
    }

    /// Records in this chain so far.
    pub fn len(&self) -> usize {
        self.chain.element_count
    }

    /// Whether this chain holds no records.
    pub fn is_empty(&self) -> bool {
        self.chain.element_count == 0
    }

    /// Append one record.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is not exactly one record long.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        assert_eq!(
            bytes.len(),
            self.element_size,
            "record must be exactly {} bytes",
            self.element_size
        );
        let dst = self.chain.reserve_slot(self.source, self.element_size);
        // SAFETY: `dst` is a fresh slot of `element_size` bytes in a live
        // block; `bytes` cannot alias it.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), dst.as_ptr(), self.element_size) };
    }

    /// Append one Pod record.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not exactly one record in size.
    pub fn write<T: Pod>(&mut self, value: T) {
        self.write_bytes(bytemuck::bytes_of(&value));
    }

    /// Claim one zeroed record slot for in-place construction.
    pub fn allocate(&mut self) -> &mut [u8] {
        let dst = self.chain.reserve_slot(self.source, self.element_size);
        // SAFETY: fresh zeroed slot, exclusively borrowed through `self`.
        unsafe { slice::from_raw_parts_mut(dst.as_ptr(), self.element_size) }
    }
}

#[cfg(test)]
mod tests {
    use crate::{BlockListConfig, RawBlockList};
    use parablock_core::ThreadIndex;
    use std::thread;

    #[test]
    fn writers_are_send_across_scoped_threads() {
        let mut list =
            RawBlockList::new(BlockListConfig::new(8, 16).with_thread_count(4)).unwrap();
        let writers = list.writers();
        thread::scope(|s| {
            for mut w in writers {
                s.spawn(move || {
                    let t = u64::from(w.thread().0);
                    for i in 0..100u64 {
                        w.write(t * 1000 + i);
                    }
                });
            }
        });
        assert_eq!(list.count(), 400);
        for t in 0..4u16 {
            let values: Vec<u64> = list
                .enumerate(ThreadIndex(t))
                .map(|b| u64::from_le_bytes(b.try_into().unwrap()))
                .collect();
            let expected: Vec<u64> = (0..100).map(|i| u64::from(t) * 1000 + i).collect();
            assert_eq!(values, expected);
        }
    }

    #[test]
    fn single_writer_allocates_in_place() {
        let mut list =
            RawBlockList::new(BlockListConfig::new(2, 2).with_thread_count(2)).unwrap();
        {
            let mut w = list.writer(ThreadIndex(1));
            w.allocate().copy_from_slice(&[1, 2]);
            w.allocate()[1] = 9;
            assert_eq!(w.len(), 2);
            assert!(!w.is_empty());
        }
        assert_eq!(list.to_bytes(), vec![1, 2, 0, 9]);
        assert_eq!(list.chain_len(ThreadIndex(0)), 0);
    }

    #[test]
    #[should_panic(expected = "exactly 4 bytes")]
    fn write_of_wrong_size_panics() {
        let mut list =
            RawBlockList::new(BlockListConfig::new(4, 2).with_thread_count(1)).unwrap();
        list.writer(ThreadIndex(0)).write(1u64);
    }
}
