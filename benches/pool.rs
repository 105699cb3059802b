//! Benchmarks for Pool and AutoReturnPool
//!
//! Target: get/return round trip well under the cost of the allocation it saves

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use object_recycler::{AutoReturnPool, ObjectPool, Pool, PooledObjectWrapper};

fn bench_pool_round_trip(c: &mut Criterion) {
    let pool = Pool::<Vec<u8>>::resettable_with_factory(|| Vec::with_capacity(4096));
    pool.prewarm(16).unwrap();

    c.bench_function("pool_get_return", |b| {
        b.iter(|| {
            let mut buf = pool.get().unwrap();
            buf.push(black_box(1));
            pool.return_object(buf)
        })
    });
}

fn bench_allocation_baseline(c: &mut Criterion) {
    c.bench_function("alloc_baseline", |b| {
        b.iter(|| {
            let mut buf: Vec<u8> = Vec::with_capacity(4096);
            buf.push(black_box(1));
            buf
        })
    });
}

fn bench_auto_return(c: &mut Criterion) {
    let pool = AutoReturnPool::with_factory(|| PooledObjectWrapper::new(vec![0u8; 4096]));
    pool.prewarm(16).unwrap();

    c.bench_function("auto_return_dispose", |b| {
        b.iter(|| {
            let obj = pool.get().unwrap();
            black_box(obj.resource().len());
            obj.dispose()
        })
    });

    c.bench_function("auto_return_leak_recovery", |b| {
        b.iter(|| {
            // Dropped handle is recovered by the next get
            let obj = pool.get().unwrap();
            black_box(obj.resource().len());
        })
    });
}

criterion_group!(
    benches,
    bench_pool_round_trip,
    bench_allocation_baseline,
    bench_auto_return
);
criterion_main!(benches);
