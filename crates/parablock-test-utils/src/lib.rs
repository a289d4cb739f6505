//! Test utilities for Parablock development.
//!
//! Provides Pod record types with self-checking payloads ([`Sample`],
//! [`Tagged`]), write-plan helpers that fill an arena thread by thread,
//! and mock [`Scheduler`](parablock_core::Scheduler) implementations in
//! [`fixtures`].

#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use bytemuck::{Pod, Zeroable};
use parablock_arena::{BlockAllocator, BlockList};
use parablock_core::ThreadIndex;

/// A record that remembers which thread wrote it and in what order.
///
/// `check` is derived from `thread` and `seq`, so a torn or misplaced
/// write shows up as an inconsistent record.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Sample {
    pub thread: u32,
    pub seq: u32,
    pub check: u64,
}

impl Sample {
    pub fn new(thread: u32, seq: u32) -> Self {
        Self {
            thread,
            seq,
            check: mix(thread, seq),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.check == mix(self.thread, self.seq)
    }
}

fn mix(thread: u32, seq: u32) -> u64 {
    let x = ((u64::from(thread) << 32) | u64::from(seq)).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    x ^ (x >> 29)
}

/// A small keyed record with float payload.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Tagged {
    pub key: u64,
    pub value: [f32; 2],
}

/// Per-thread record counts: `plan[t]` records go to thread `t`.
pub type WritePlan = [usize];

/// The records [`fill_sequential`] and [`fill_parallel`] write, in
/// readback order.
pub fn expected_samples(plan: &WritePlan) -> Vec<Sample> {
    plan.iter()
        .enumerate()
        .flat_map(|(t, &n)| (0..n).map(move |s| Sample::new(t as u32, s as u32)))
        .collect()
}

/// Write `plan` from the calling thread, one chain after another.
pub fn fill_sequential<A: BlockAllocator>(list: &mut BlockList<Sample, A>, plan: &WritePlan) {
    for (t, &n) in plan.iter().enumerate() {
        let mut writer = list.writer(ThreadIndex(t as u16));
        for s in 0..n {
            writer.write(Sample::new(t as u32, s as u32));
        }
    }
}

/// Write `plan` with one scoped thread per chain.
pub fn fill_parallel<A: BlockAllocator>(list: &mut BlockList<Sample, A>, plan: &WritePlan) {
    let writers = list.writers();
    std::thread::scope(|s| {
        for mut writer in writers {
            let n = plan.get(writer.thread().get()).copied().unwrap_or(0);
            s.spawn(move || {
                let t = writer.thread().0 as u32;
                writer.extend((0..n).map(|seq| Sample::new(t, seq as u32)));
            });
        }
    });
}
