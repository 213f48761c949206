//! Criterion micro-benchmarks for the occupancy tracker.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use heapreel_engine::Tracker;

/// Benchmark: set then unset 1K blocks of 16 bytes in a 16K space.
fn bench_tracker_set_unset(c: &mut Criterion) {
    c.bench_function("tracker_set_unset_1k", |b| {
        let mut tracker = Tracker::new(16 * 1024);
        b.iter(|| {
            for i in 0..1024u32 {
                tracker.set(i * 16, 16).unwrap();
            }
            for i in 0..1024u32 {
                tracker.unset(i * 16, 16).unwrap();
            }
            black_box(tracker.occupied());
        });
    });
}

/// Benchmark: a single large block spanning most of the space.
fn bench_tracker_large_block(c: &mut Criterion) {
    c.bench_function("tracker_large_block_60k", |b| {
        let mut tracker = Tracker::new(64 * 1024);
        b.iter(|| {
            tracker.set(1, 60_000).unwrap();
            tracker.unset(1, 60_000).unwrap();
        });
    });
}

/// Benchmark: peak and range queries over a fragmented space.
fn bench_tracker_queries(c: &mut Criterion) {
    let mut tracker = Tracker::new(16 * 1024);
    for i in (0..16 * 1024u32).step_by(24) {
        tracker.set(i, 8).unwrap();
    }

    c.bench_function("tracker_ranges_fragmented", |b| {
        b.iter(|| black_box(tracker.ranges()));
    });
    c.bench_function("tracker_peak_fragmented", |b| {
        b.iter(|| black_box(tracker.peak_address()));
    });
}

criterion_group!(
    benches,
    bench_tracker_set_unset,
    bench_tracker_large_block,
    bench_tracker_queries
);
criterion_main!(benches);
