//! Restartable cursors over a single chain.
//!
//! [`ChainEnumerator`] walks one thread's records in write order without
//! copying blocks. It follows the classic `move_next`/`current` protocol and
//! also implements [`Iterator`]. [`ChainIter`] is the typed counterpart
//! used by `BlockList<T>`.

use std::marker::PhantomData;

use bytemuck::Pod;

use crate::chain::Chain;

/// Forward-only, restartable cursor over one chain.
///
/// Starts positioned before the first record. A chain must not be written
/// while an enumerator over it is alive; the borrow on the list enforces
/// this for safe writers.
pub struct ChainEnumerator<'a> {
    chain: &'a Chain,
    element_size: usize,
    elements_per_block: usize,
    /// `(block, record within block)` of the current record.
    position: Option<(usize, usize)>,
    exhausted: bool,
}

impl<'a> ChainEnumerator<'a> {
    pub(crate) fn new(chain: &'a Chain, element_size: usize, elements_per_block: usize) -> Self {
        Self {
            chain,
            element_size,
            elements_per_block,
            position: None,
            exhausted: false,
        }
    }

    /// Advance to the next record. Returns `false` once past the last one.
    pub fn move_next(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        let (mut block, mut index) = match self.position {
            None => (0, 0),
            Some((block, index)) => (block, index + 1),
        };
        if index >= self.chain.valid_in_block(block, self.elements_per_block) {
            block += 1;
            index = 0;
        }
        if block >= self.chain.blocks.len()
            || index >= self.chain.valid_in_block(block, self.elements_per_block)
        {
            self.position = None;
            self.exhausted = true;
            return false;
        }
        self.position = Some((block, index));
        true
    }

    /// Bytes of the current record.
    ///
    /// # Panics
    ///
    /// Panics if called before a successful [`move_next`](Self::move_next)
    /// or after it returned `false`.
    pub fn current_bytes(&self) -> &'a [u8] {
        let Some((block, index)) = self.position else {
            panic!("enumerator is not positioned on a record");
        };
        let start = index * self.element_size;
        &self.chain.blocks[block].bytes()[start..start + self.element_size]
    }

    /// The current record reinterpreted as `U`.
    ///
    /// # Panics
    ///
    /// Panics if `U` is not exactly one record in size, or if the cursor is
    /// not positioned on a record.
    pub fn current<U: Pod>(&self) -> U {
        assert_eq!(
            std::mem::size_of::<U>(),
            self.element_size,
            "record type size does not match element size"
        );
        bytemuck::pod_read_unaligned(self.current_bytes())
    }

    /// Rewind to before the first record.
    pub fn reset(&mut self) {
        self.position = None;
        self.exhausted = false;
    }

    /// Records in the chain (independent of the cursor).
    pub fn len(&self) -> usize {
        self.chain.element_count
    }

    /// Whether the chain holds no records.
    pub fn is_empty(&self) -> bool {
        self.chain.element_count == 0
    }

    fn consumed(&self) -> usize {
        match (self.exhausted, self.position) {
            (true, _) => self.chain.element_count,
            (false, None) => 0,
            (false, Some((block, index))) => block * self.elements_per_block + index + 1,
        }
    }
}

impl<'a> Iterator for ChainEnumerator<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.move_next() {
            Some(self.current_bytes())
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.chain.element_count - self.consumed();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChainEnumerator<'_> {}

/// Typed iterator over one chain of a `BlockList<T>`.
pub struct ChainIter<'a, T> {
    inner: ChainEnumerator<'a>,
    _marker: PhantomData<&'a T>,
}

impl<'a, T: Pod> ChainIter<'a, T> {
    pub(crate) fn new(inner: ChainEnumerator<'a>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Rewind to the first record.
    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

impl<'a, T: Pod> Iterator for ChainIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        // Blocks are aligned to at least align_of::<T>() and records are
        // size_of::<T>() apart, so every record is aligned.
        self.inner.next().map(bytemuck::from_bytes)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T: Pod> ExactSizeIterator for ChainIter<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{CountingAllocator, Global};
    use crate::raw::BlockSource;
    use std::alloc::Layout;

    struct Fixture {
        source: BlockSource<CountingAllocator>,
        chain: Chain,
    }

    impl Fixture {
        fn with_values(per_block: usize, values: &[u32]) -> Self {
            let source = BlockSource::new(
                CountingAllocator::new(Global),
                Layout::from_size_align(4 * per_block, 64).unwrap(),
            );
            let mut chain = Chain::default();
            for v in values {
                let slot = chain.reserve_slot(&source, 4);
                // SAFETY: slot addresses 4 fresh bytes in a live block.
                unsafe { std::ptr::copy_nonoverlapping(v.to_le_bytes().as_ptr(), slot.as_ptr(), 4) };
            }
            Self { source, chain }
        }

        fn enumerator(&self, per_block: usize) -> ChainEnumerator<'_> {
            ChainEnumerator::new(&self.chain, 4, per_block)
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            self.chain.release(&self.source);
        }
    }

    #[test]
    fn yields_values_across_blocks() {
        let fx = Fixture::with_values(4, &[1, 2, 3, 4, 5]);
        let mut e = fx.enumerator(4);
        let mut seen = Vec::new();
        while e.move_next() {
            seen.push(e.current::<u32>());
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert!(!e.move_next());
    }

    #[test]
    fn empty_chain_yields_nothing() {
        let fx = Fixture::with_values(4, &[]);
        let mut e = fx.enumerator(4);
        assert!(!e.move_next());
        assert!(e.is_empty());
    }

    #[test]
    fn exact_multiple_of_block_size() {
        let fx = Fixture::with_values(2, &[7, 8, 9, 10]);
        let values: Vec<u32> = fx.enumerator(2).map(|b| u32::from_le_bytes(b.try_into().unwrap())).collect();
        assert_eq!(values, vec![7, 8, 9, 10]);
    }

    #[test]
    fn reset_restarts_iteration() {
        let fx = Fixture::with_values(2, &[1, 2, 3]);
        let mut e = fx.enumerator(2);
        assert!(e.move_next());
        assert!(e.move_next());
        e.reset();
        assert!(e.move_next());
        assert_eq!(e.current::<u32>(), 1);
    }

    #[test]
    fn size_hint_tracks_progress() {
        let fx = Fixture::with_values(2, &[1, 2, 3]);
        let mut e = fx.enumerator(2);
        assert_eq!(e.len(), 3);
        assert_eq!(e.size_hint(), (3, Some(3)));
        e.next();
        e.next();
        assert_eq!(e.size_hint(), (1, Some(1)));
        e.next();
        assert_eq!(e.size_hint(), (0, Some(0)));
        assert!(e.next().is_none());
        assert_eq!(e.size_hint(), (0, Some(0)));
    }

    #[test]
    #[should_panic(expected = "not positioned")]
    fn current_before_move_next_panics() {
        let fx = Fixture::with_values(2, &[1]);
        let e = fx.enumerator(2);
        let _ = e.current_bytes();
    }

    #[test]
    #[should_panic(expected = "does not match element size")]
    fn current_with_wrong_size_panics() {
        let fx = Fixture::with_values(2, &[1]);
        let mut e = fx.enumerator(2);
        e.move_next();
        let _ = e.current::<u64>();
    }

    #[test]
    fn typed_iter_reads_records() {
        let fx = Fixture::with_values(3, &[4, 5, 6, 7]);
        let mut it: ChainIter<'_, u32> = ChainIter::new(fx.enumerator(3));
        assert_eq!(it.by_ref().copied().collect::<Vec<_>>(), vec![4, 5, 6, 7]);
        it.reset();
        assert_eq!(it.next(), Some(&4));
    }
}
