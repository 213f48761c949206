//! Criterion benchmarks for compilation and execution.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use heapreel_bench::{churn_calls, churn_capacity, churn_profile};
use heapreel_engine::{run, time, EngineConfig};
use heapreel_sandbox::{Sandbox, SandboxOptions};
use heapreel_test_utils::{allocators, MockHost};
use heapreel_workload::{compile, CompilerConfig};

const THREADS: usize = 4;
const OPS: usize = 250;

/// Benchmark: compile a 4-thread, 1K-malloc workload.
fn bench_compile(c: &mut Criterion) {
    let nodes = churn_profile(THREADS, OPS);
    let config = CompilerConfig::default();

    c.bench_function("compile_churn_4x250", |b| {
        b.iter(|| black_box(compile(&nodes, &config).unwrap()));
    });
}

/// Benchmark: validated run against the native first-fit host.
fn bench_run_native(c: &mut Criterion) {
    let calls = churn_calls(THREADS, OPS).unwrap();
    let config = EngineConfig::default();

    c.bench_function("run_native_churn_4x250", |b| {
        b.iter_batched(
            || (MockHost::new(churn_capacity(THREADS)), calls.clone()),
            |(host, calls)| black_box(run(host, calls, &config).unwrap()),
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: validated run against the wasm first-fit allocator.
///
/// Sandbox loading happens in setup, so only execution is measured.
fn bench_run_sandbox(c: &mut Criterion) {
    let calls = churn_calls(THREADS, OPS).unwrap();
    let config = EngineConfig::default();
    let options = SandboxOptions::with_capacity(churn_capacity(THREADS));

    c.bench_function("run_sandbox_churn_4x250", |b| {
        b.iter_batched(
            || {
                let sandbox = Sandbox::load(allocators::FIRST_FIT, options.clone()).unwrap();
                (sandbox, calls.clone())
            },
            |(sandbox, calls)| black_box(run(sandbox, calls, &config).unwrap()),
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: raw throughput timing, the unvalidated path.
fn bench_time_sandbox(c: &mut Criterion) {
    let calls = churn_calls(THREADS, OPS).unwrap();
    let options = SandboxOptions::with_capacity(churn_capacity(THREADS));

    c.bench_function("time_sandbox_churn_4x250", |b| {
        b.iter_batched(
            || Sandbox::load(allocators::FIRST_FIT, options.clone()).unwrap(),
            |mut sandbox| black_box(time(&mut sandbox, &calls).unwrap()),
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: parsing and instantiating an allocator module.
fn bench_sandbox_load(c: &mut Criterion) {
    let options = SandboxOptions::with_capacity(256);

    c.bench_function("sandbox_load_first_fit", |b| {
        b.iter(|| black_box(Sandbox::load(allocators::FIRST_FIT, options.clone()).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_compile,
    bench_run_native,
    bench_run_sandbox,
    bench_time_sandbox,
    bench_sandbox_load
);
criterion_main!(benches);
