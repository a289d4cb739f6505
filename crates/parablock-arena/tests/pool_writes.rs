//! Pool workers write through their own thread index; the consumer reads
//! after the join.

use std::sync::Arc;

use parablock_arena::BlockList;
use parablock_core::{JobHandle, ThreadIndex};
use parablock_jobs::{PoolConfig, WorkerPool};
use parablock_test_utils::Sample;

#[test]
fn parallel_for_writes_every_item_once() {
    let pool = WorkerPool::new(PoolConfig::with_workers(4)).unwrap();
    let list = Arc::new(BlockList::<Sample>::with_thread_count(pool.worker_count(), 16).unwrap());

    let writer = Arc::clone(&list);
    let done = pool
        .parallel_for(JobHandle::completed(), 1000, 37, move |thread: ThreadIndex, i| {
            // SAFETY: the pool runs at most one job per worker index at a
            // time, and nothing reads the list until `done` completes.
            unsafe { writer.write(thread, Sample::new(thread.0 as u32, i as u32)) };
        })
        .unwrap();
    done.wait();

    assert_eq!(list.count(), 1000);
    let mut items: Vec<u32> = list.iter_all().map(|s| s.seq).collect();
    items.sort_unstable();
    assert_eq!(items, (0..1000).collect::<Vec<_>>());
    for t in 0..pool.worker_count() {
        let index = ThreadIndex(t as u16);
        assert!(list.iter(index).all(|s| s.thread == t as u32 && s.is_consistent()));
    }
    assert_eq!(pool.panicked_jobs(), 0);
}

#[test]
fn chain_order_follows_job_order_per_worker() {
    let pool = WorkerPool::new(PoolConfig::with_workers(1)).unwrap();
    let list = Arc::new(BlockList::<u32>::with_thread_count(1, 4).unwrap());

    let mut prev = JobHandle::completed();
    for v in 0..10u32 {
        let writer = Arc::clone(&list);
        prev = pool
            .schedule_indexed(prev, move |thread| {
                // SAFETY: single worker, jobs chained by dependency.
                unsafe { writer.write(thread, v) };
            })
            .unwrap();
    }
    prev.wait();
    assert_eq!(list.to_vec(), (0..10).collect::<Vec<_>>());
}

#[test]
fn write_phase_then_deferred_disposal() {
    let pool = WorkerPool::new(PoolConfig::with_workers(3)).unwrap();
    let list = Arc::new(BlockList::<u64>::with_thread_count(3, 8).unwrap());

    let writer = Arc::clone(&list);
    let written = pool
        .parallel_for(JobHandle::completed(), 300, 10, move |thread, i| {
            // SAFETY: one job per worker index at a time; no concurrent readers.
            unsafe { writer.write(thread, i as u64) };
        })
        .unwrap();

    let reader = Arc::clone(&list);
    let summed = pool
        .schedule_indexed(written.clone(), move |_| {
            assert_eq!(reader.iter_all().sum::<u64>(), (0..300).sum::<u64>());
        })
        .unwrap();
    summed.wait();
    assert_eq!(pool.panicked_jobs(), 0);

    let list = Arc::try_unwrap(list).ok().unwrap();
    list.dispose_after_on(summed, &pool).unwrap().wait();
}
