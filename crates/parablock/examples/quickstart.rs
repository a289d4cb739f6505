//! One fork-join pass: pool workers append hits to a per-thread arena, the
//! main thread reads them back, and the arena is disposed after a
//! follow-up job.
//!
//! ```text
//! RUST_LOG=parablock_arena=debug,parablock_jobs=debug cargo run --example quickstart
//! ```

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use parablock::prelude::*;
use tracing_subscriber::EnvFilter;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct Hit {
    entity: u32,
    distance: f32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .init();

    let pool = WorkerPool::new(PoolConfig::default())?;
    let hits = Arc::new(BlockList::<Hit>::with_thread_count(pool.worker_count(), 128)?);

    let writer = Arc::clone(&hits);
    let cast = pool.parallel_for(JobHandle::completed(), 10_000, 250, move |thread, i| {
        if i % 7 == 0 {
            let hit = Hit {
                entity: i as u32,
                distance: (i as f32).sqrt(),
            };
            // SAFETY: each worker writes only its own index, and the list
            // is read only after `cast` completes.
            unsafe { writer.write(thread, hit) };
        }
    })?;
    cast.wait();

    tracing::info!(
        hits = hits.count(),
        blocks = hits.total_block_count(),
        bytes = hits.memory_bytes(),
        "raycast pass finished"
    );
    for t in 0..hits.thread_count() {
        let index = ThreadIndex(t as u16);
        tracing::info!(thread = %index, hits = hits.chain_len(index), "per-thread output");
    }

    let nearest = hits
        .iter_all()
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
        .copied();
    println!("nearest hit: {nearest:?}");

    let hits = Arc::try_unwrap(hits).map_err(|_| "arena still shared")?;
    let report = pool.run(|thread| tracing::info!(%thread, "report job ran"))?;
    hits.dispose_after_on(report, &pool)?.wait();
    Ok(())
}
