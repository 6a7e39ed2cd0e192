//! Block pool throughput benchmarks
//!
//! Compares pooled acquire/release against going to the allocator each time.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use nebula_mempool::{Allocator, BlockPool, PoolConfig, SharedBlockPool, SystemAllocator};
use std::alloc::Layout;
use std::hint::black_box;

const BLOCK_SIZES: [usize; 3] = [64, 4096, 16384];

/// Single acquire/release cycle, always served from the cache after warmup
fn bench_single_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_cycle");

    for size in BLOCK_SIZES {
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("pool", size), &size, |b, &size| {
            let pool = BlockPool::new(size, 16).unwrap();
            pool.prewarm(1).unwrap();

            b.iter(|| {
                let block = pool.acquire().unwrap();
                black_box(block.as_ptr());
                pool.release(block).unwrap();
            });
        });

        // Baseline: straight to the allocator
        group.bench_with_input(BenchmarkId::new("system", size), &size, |b, &size| {
            let allocator = SystemAllocator::new();
            let layout = Layout::from_size_align(size, 16).unwrap();

            b.iter(|| unsafe {
                let ptr = allocator.allocate(layout).unwrap();
                black_box(ptr);
                allocator.deallocate(ptr.cast(), layout);
            });
        });
    }

    group.finish();
}

/// Burst of outstanding blocks, as a busy connection set would hold
fn bench_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("burst");
    let burst = 256;

    for capacity in [0usize, 64, 256] {
        group.bench_with_input(
            BenchmarkId::new("capacity", capacity),
            &capacity,
            |b, &capacity| {
                let pool = BlockPool::with_config(PoolConfig::production(4096, capacity)).unwrap();
                let mut held = Vec::with_capacity(burst);

                b.iter(|| {
                    for _ in 0..burst {
                        held.push(pool.acquire().unwrap());
                    }
                    for block in held.drain(..) {
                        pool.release(block).unwrap();
                    }
                });
            },
        );
    }

    group.finish();
}

/// Lock overhead of the shared wrapper, uncontended
fn bench_shared(c: &mut Criterion) {
    c.bench_function("shared_single_cycle", |b| {
        let pool = SharedBlockPool::new(4096, 16).unwrap();
        pool.prewarm(1).unwrap();

        b.iter(|| {
            let block = pool.acquire().unwrap();
            black_box(block.as_ptr());
            pool.release(block).unwrap();
        });
    });
}

criterion_group!(benches, bench_single_cycle, bench_burst, bench_shared);
criterion_main!(benches);
