//! Criterion benchmarks for replay seeking and trace hashing.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use heapreel_bench::{churn_calls, churn_capacity};
use heapreel_core::Trace;
use heapreel_engine::{run, EngineConfig};
use heapreel_replay::{from_json, to_json, trace_hash, Replay};
use heapreel_test_utils::{GridView, MockHost};

const THREADS: usize = 4;
const OPS: usize = 250;

fn churn_trace() -> Trace {
    let calls = churn_calls(THREADS, OPS).unwrap();
    let host = MockHost::new(churn_capacity(THREADS)).annotating();
    run(host, calls, &EngineConfig::default()).unwrap().trace
}

fn replay() -> Replay<GridView> {
    Replay::new(churn_trace(), GridView::new(churn_capacity(THREADS))).unwrap()
}

/// Benchmark: jump between the two ends of a 2K-event trace.
fn bench_seek_end_to_end(c: &mut Criterion) {
    let mut r = replay();
    let mut p = 0.0;

    c.bench_function("replay_seek_end_to_end", |b| {
        b.iter(|| {
            p = 1.0 - p;
            r.set_progress(p).unwrap();
            black_box(r.reached());
        });
    });
}

/// Benchmark: scrub forward in 100 small steps.
fn bench_scrub(c: &mut Criterion) {
    let mut r = replay();

    c.bench_function("replay_scrub_100_steps", |b| {
        b.iter(|| {
            for i in 0..=100 {
                r.set_progress(i as f64 / 100.0).unwrap();
            }
            r.set_progress(0.0).unwrap();
        });
    });
}

/// Benchmark: building a replay, including segment construction.
fn bench_replay_new(c: &mut Criterion) {
    let trace = churn_trace();
    let capacity = churn_capacity(THREADS);

    c.bench_function("replay_new_churn_4x250", |b| {
        b.iter(|| black_box(Replay::new(trace.clone(), GridView::new(capacity)).unwrap()));
    });
}

/// Benchmark: hashing and the JSON codec over the same trace.
fn bench_trace_io(c: &mut Criterion) {
    let trace = churn_trace();
    let json = to_json(&trace).unwrap();

    c.bench_function("trace_hash_churn", |b| {
        b.iter(|| black_box(trace_hash(&trace)));
    });
    c.bench_function("trace_encode_json", |b| {
        b.iter(|| black_box(to_json(&trace).unwrap()));
    });
    c.bench_function("trace_decode_json", |b| {
        b.iter(|| black_box(from_json(&json).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_seek_end_to_end,
    bench_scrub,
    bench_replay_new,
    bench_trace_io
);
criterion_main!(benches);
