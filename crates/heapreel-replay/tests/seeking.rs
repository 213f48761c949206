//! Integration test: replaying executed traces.
//!
//! Traces come from real engine runs over seeded random workloads. The
//! tests check that seeking is path-independent, that the final frame
//! matches the run's live allocations, and that traces survive a trip
//! through the JSON codec.

use heapreel_core::Trace;
use heapreel_engine::{run, EngineConfig};
use heapreel_replay::{read_trace, state_hash, trace_hash, write_trace, Replay};
use heapreel_sandbox::{Sandbox, SandboxOptions};
use heapreel_test_utils::{allocators, random_workload, GridView, MockHost};
use heapreel_workload::{compile, CompilerConfig};
use proptest::prelude::*;

const CAPACITY: u32 = 128;

fn executed(seed: u64) -> (Trace, Vec<u32>) {
    let nodes = random_workload(seed, 2, 6, CAPACITY);
    let calls = compile(&nodes, &CompilerConfig::default()).unwrap();
    let run = run(
        MockHost::new(CAPACITY).annotating(),
        calls,
        &EngineConfig::default(),
    )
    .unwrap();
    let mut live: Vec<u32> = run
        .live_allocations
        .values()
        .flat_map(|a| a.address..a.address + a.size)
        .collect();
    live.sort_unstable();
    (run.trace, live)
}

fn replay(trace: Trace) -> Replay<GridView> {
    Replay::new(trace, GridView::new(CAPACITY)).unwrap()
}

// ── Path independence ───────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn seek_result_ignores_where_it_came_from(seed in 0u64..32, p in 0.0f64..=1.0) {
        let (trace, _) = executed(seed);

        let mut forward = replay(trace.clone());
        forward.set_progress(0.0).unwrap();
        forward.set_progress(p).unwrap();

        let mut backward = replay(trace.clone());
        backward.set_progress(1.0).unwrap();
        backward.set_progress(p).unwrap();

        let mut direct = replay(trace);
        direct.set_progress(p).unwrap();

        prop_assert_eq!(state_hash(forward.state()), state_hash(backward.state()));
        prop_assert_eq!(forward.state(), direct.state());
        prop_assert_eq!(forward.view().painted(), backward.view().painted());
        prop_assert_eq!(forward.view().painted(), direct.view().painted());
    }

    #[test]
    fn stepping_retraces_exactly(seed in 0u64..16) {
        let (trace, _) = executed(seed);
        let mut r = replay(trace);

        let mut forward = vec![r.time()];
        for _ in 0..r.calls().len() + 2 {
            r.next();
            forward.push(r.time());
        }
        prop_assert_eq!(r.progress(), 1.0);

        let mut backward = vec![r.time()];
        for _ in 0..r.calls().len() + 2 {
            r.prev();
            backward.push(r.time());
        }
        prop_assert_eq!(r.progress(), 0.0);

        forward.dedup();
        backward.dedup();
        backward.reverse();
        prop_assert_eq!(forward, backward);
    }
}

// ── Final frame ─────────────────────────────────────────────────────

#[test]
fn final_frame_shows_exactly_the_live_blocks() {
    for seed in 0..8 {
        let (trace, live) = executed(seed);
        let mut r = replay(trace);
        r.set_progress(1.0).unwrap();
        assert_eq!(r.view().visible(), live, "seed {seed}");
        assert_eq!(r.state().filled(), live.len());
    }
}

#[test]
fn sandbox_trace_replays_like_a_native_one() {
    let nodes = random_workload(11, 2, 8, CAPACITY);
    let calls = compile(&nodes, &CompilerConfig::default()).unwrap();
    let sandbox =
        Sandbox::load(allocators::FIRST_FIT, SandboxOptions::with_capacity(CAPACITY)).unwrap();
    let wasm = run(sandbox, calls.clone(), &EngineConfig::default()).unwrap();
    let native = run(MockHost::new(CAPACITY), calls, &EngineConfig::default()).unwrap();

    let mut a = replay(wasm.trace);
    let mut b = replay(native.trace);
    for p in [0.0, 0.25, 0.5, 0.75, 1.0] {
        a.set_progress(p).unwrap();
        b.set_progress(p).unwrap();
        assert_eq!(a.view().painted(), b.view().painted(), "progress {p}");
    }
}

// ── Codec ───────────────────────────────────────────────────────────

#[test]
fn codec_round_trip_preserves_hash_and_frames() {
    let (trace, _) = executed(5);
    let mut buf = Vec::new();
    write_trace(&trace, &mut buf).unwrap();
    let decoded = read_trace(buf.as_slice()).unwrap();
    assert_eq!(trace_hash(&decoded), trace_hash(&trace));

    let mut original = replay(trace);
    let mut reloaded = replay(decoded);
    for p in [0.1, 0.6, 1.0] {
        original.set_progress(p).unwrap();
        reloaded.set_progress(p).unwrap();
        assert_eq!(state_hash(original.state()), state_hash(reloaded.state()));
    }
}
