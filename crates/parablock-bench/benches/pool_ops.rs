//! Criterion benchmarks for pool-driven writes and deferred disposal.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use parablock_arena::BlockList;
use parablock_core::JobHandle;
use parablock_jobs::{PoolConfig, WorkerPool};
use parablock_test_utils::Sample;

fn bench_pool_parallel_for_32k(c: &mut Criterion) {
    let pool = WorkerPool::new(PoolConfig::default()).unwrap();
    c.bench_function("pool_parallel_for_32k", |b| {
        b.iter(|| {
            let list =
                Arc::new(BlockList::<Sample>::with_thread_count(pool.worker_count(), 256).unwrap());
            let writer = Arc::clone(&list);
            pool.parallel_for(JobHandle::completed(), 32 * 1024, 512, move |t, i| {
                // SAFETY: one job per worker index at a time; readers wait
                // for the returned handle.
                unsafe { writer.write(t, Sample::new(t.0 as u32, i as u32)) };
            })
            .unwrap()
            .wait();
            black_box(list.count());
        });
    });
}

fn bench_deferred_dispose(c: &mut Criterion) {
    let pool = WorkerPool::new(PoolConfig::with_workers(2)).unwrap();
    c.bench_function("dispose_after_on_pool", |b| {
        b.iter(|| {
            let mut list = BlockList::<u64>::with_thread_count(2, 64).unwrap();
            list.writer(parablock_core::ThreadIndex(0)).extend(0..1024u64);
            list.dispose_after_on(JobHandle::completed(), &pool)
                .unwrap()
                .wait();
        });
    });
}

criterion_group!(benches, bench_pool_parallel_for_32k, bench_deferred_dispose);
criterion_main!(benches);
