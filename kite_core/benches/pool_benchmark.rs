//! Pool acquire/release latency, uncontended and under thread contention.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use kite_core::pool::Pool;
use std::hint::black_box;
use std::sync::Barrier;
use std::thread;

#[derive(Default)]
struct Sample {
    _payload: [f32; 8],
}

/// Single caller: one acquire + release per iteration.
fn bench_acquire_release(c: &mut Criterion) {
    let pool: Pool<Sample, 16> = Pool::new();

    c.bench_function("pool_acquire_release_16", |b| {
        b.iter(|| {
            let slot = black_box(pool.acquire().unwrap());
            assert!(pool.release(slot));
        });
    });
}

/// First-fit scan cost when only the last slot is free.
fn bench_scan_to_last_slot(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_scan_last_free");

    macro_rules! scan_case {
        ($n:literal) => {{
            let pool: Pool<u32, $n> = Pool::new();
            let held: Vec<_> = (0..$n - 1).map(|_| pool.acquire().unwrap()).collect();
            group.bench_with_input(BenchmarkId::from_parameter($n), &$n, |b, _| {
                b.iter(|| {
                    let slot = black_box(pool.acquire().unwrap());
                    assert!(pool.release(slot));
                });
            });
            for slot in held {
                assert!(pool.release(slot));
            }
        }};
    }

    scan_case!(8);
    scan_case!(64);
    scan_case!(256);
    group.finish();
}

/// Four threads hammering one pool.
fn bench_contended(c: &mut Criterion) {
    const THREADS: usize = 4;
    const OPS: usize = 1_000;
    let pool: Pool<Sample, 8> = Pool::new();

    c.bench_function("pool_contended_4_threads", |b| {
        b.iter(|| {
            let barrier = Barrier::new(THREADS);
            thread::scope(|s| {
                for _ in 0..THREADS {
                    s.spawn(|| {
                        barrier.wait();
                        for _ in 0..OPS {
                            if let Some(slot) = pool.acquire() {
                                black_box(&*slot);
                                assert!(pool.release(slot));
                            }
                        }
                    });
                }
            });
        });
    });
}

criterion_group!(
    benches,
    bench_acquire_release,
    bench_scan_to_last_slot,
    bench_contended
);
criterion_main!(benches);
