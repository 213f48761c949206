//! Integration test: loading and calling the fixture allocators.
//!
//! Covers every load stage that can reject a module, the call-time
//! error mapping (missing exports, traps, binding faults, fuel), the
//! store's memory limit, and the side-effect queues fed by the host
//! bindings.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use heapreel_core::{AllocatorHost, Annotation, AnnotationKind, HostError, LogLevel, ThreadId};
use heapreel_sandbox::{LoadStage, Sandbox, SandboxError, SandboxOptions};
use heapreel_test_utils::allocators;

const PAGE: usize = 64 * 1024;

fn load(source: &str, capacity: u32) -> Sandbox {
    Sandbox::load(source, SandboxOptions::with_capacity(capacity)).unwrap()
}

fn load_stage(source: &str) -> LoadStage {
    match Sandbox::load(source, SandboxOptions::default()) {
        Err(SandboxError::Load { stage, .. }) => stage,
        other => panic!("expected a load error, got {other:?}"),
    }
}

// ── Loading ─────────────────────────────────────────────────────────

#[test]
fn each_broken_module_fails_at_its_stage() {
    assert_eq!(load_stage("(module (func"), LoadStage::Parse);
    assert_eq!(load_stage(allocators::BAD_IMPORT), LoadStage::Link);
    assert_eq!(load_stage(allocators::START_TRAP), LoadStage::Start);
    assert_eq!(load_stage(allocators::BAD_SIGNATURE), LoadStage::Exports);
}

#[test]
fn invalid_options_are_rejected_before_parsing() {
    let options = SandboxOptions::with_capacity(0);
    assert!(matches!(
        Sandbox::load(allocators::BUMP, options),
        Err(SandboxError::InvalidOptions { .. })
    ));
}

#[test]
fn fuel_covers_the_start_function() {
    let options = SandboxOptions {
        fuel: Some(10_000),
        ..SandboxOptions::default()
    };
    assert_eq!(
        Sandbox::load(allocators::START_SPIN, options).unwrap_err(),
        SandboxError::Load {
            stage: LoadStage::Start,
            reason: "fuel budget exhausted".into()
        }
    );
}

#[test]
fn initial_memory_over_the_limit_fails_at_start() {
    let options = SandboxOptions {
        memory_limit: PAGE,
        ..SandboxOptions::with_capacity(16)
    };
    // Two pages of initial memory against a one-page limit.
    let Err(SandboxError::Load { stage, .. }) = Sandbox::load(allocators::FIRST_FIT, options)
    else {
        panic!("expected a load error");
    };
    assert_eq!(stage, LoadStage::Start);
}

#[test]
fn memory_growth_stops_at_the_limit() {
    let options = SandboxOptions {
        memory_limit: 2 * PAGE,
        ..SandboxOptions::with_capacity(16)
    };
    let mut sandbox = Sandbox::load(allocators::GROWING, options).unwrap();
    assert_eq!(sandbox.malloc(1), Ok(1));
    assert_eq!(sandbox.malloc(1), Ok(-1));
    assert_eq!(sandbox.malloc(0), Ok(2));
}

#[test]
fn binary_modules_load_too() {
    let bytes = wat::parse_str(allocators::BUMP).unwrap();
    let mut sandbox = Sandbox::load(&bytes, SandboxOptions::with_capacity(8)).unwrap();
    assert_eq!(sandbox.malloc(3), Ok(0));
}

// ── Calling ─────────────────────────────────────────────────────────

#[test]
fn first_fit_reuses_freed_space() {
    let mut sandbox = load(allocators::FIRST_FIT, 16);
    assert_eq!(sandbox.malloc(8), Ok(0));
    assert_eq!(sandbox.malloc(8), Ok(8));
    assert_eq!(sandbox.malloc(1), Ok(-1));
    sandbox.free(0).unwrap();
    assert_eq!(sandbox.malloc(4), Ok(0));
    assert_eq!(sandbox.malloc(4), Ok(4));
}

#[test]
fn missing_export_is_not_implemented_at_call_time() {
    let mut sandbox = load(allocators::MISSING_FREE, 16);
    assert_eq!(sandbox.malloc(4), Ok(0));
    assert_eq!(
        sandbox.free(0),
        Err(HostError::NotImplemented { export: "free" })
    );
}

#[test]
fn traps_are_reported_not_propagated() {
    let mut sandbox = load(allocators::TRAPPING, 16);
    let Err(HostError::Trap { reason }) = sandbox.malloc(4) else {
        panic!("expected a trap");
    };
    assert!(reason.contains("unreachable"), "{reason}");
}

#[test]
fn fuel_is_refilled_for_every_call() {
    let options = SandboxOptions {
        fuel: Some(5_000),
        ..SandboxOptions::with_capacity(16)
    };
    let mut bump = Sandbox::load(allocators::BUMP, options.clone()).unwrap();
    for i in 0..16 {
        assert_eq!(bump.malloc(1), Ok(i));
    }

    let mut spin = Sandbox::load(allocators::LOOP_FOREVER, options).unwrap();
    for _ in 0..2 {
        assert_eq!(
            spin.malloc(1),
            Err(HostError::Trap {
                reason: "fuel budget exhausted".into()
            })
        );
    }
}

#[test]
fn unreadable_guest_memory_is_a_fault() {
    let mut sandbox = load(allocators::FAULTING, 16);
    let Err(HostError::Fault { reason }) = sandbox.malloc(1) else {
        panic!("expected a fault");
    };
    assert!(reason.starts_with("annotateText"), "{reason}");
    assert_eq!(sandbox.pending_annotations(), 0);
}

#[test]
fn oversized_requests_fail_without_calling_in() {
    let mut sandbox = load(allocators::TRAPPING, 16);
    assert_eq!(sandbox.malloc(u32::MAX), Ok(-1));
}

// ── Bindings ────────────────────────────────────────────────────────

#[test]
fn start_function_side_effects_wait_for_the_first_drain() {
    let mut sandbox = load(allocators::ANNOTATING, 16);
    assert_eq!(sandbox.pending_annotations(), 1);
    assert_eq!(
        sandbox.drain_annotations(),
        vec![Annotation::text(0, "heap")]
    );
    assert!(sandbox.drain_annotations().is_empty());
}

#[test]
fn calls_queue_annotations_and_logs() {
    let mut sandbox = load(allocators::ANNOTATING, 16);
    sandbox.drain_annotations();

    assert_eq!(sandbox.malloc(4), Ok(0));
    let annotations = sandbox.drain_annotations();
    assert_eq!(annotations.len(), 1);
    assert_eq!(annotations[0].kind, AnnotationKind::Range);
    assert_eq!(annotations[0].color.map(|c| c.rgb()), Some(0xff8800));

    sandbox.free(0).unwrap();
    assert_eq!(
        sandbox.drain_annotations(),
        vec![Annotation::remove(AnnotationKind::RemoveRange, 0)]
    );

    let logs = sandbox.drain_logs();
    let levels: Vec<_> = logs.iter().map(|l| l.level).collect();
    assert_eq!(levels, vec![LogLevel::Info, LogLevel::Warn]);
    assert_eq!(logs[1].message, "free");
    assert!(sandbox.drain_logs().is_empty());
}

#[test]
fn thread_id_is_visible_to_the_guest() {
    let mut sandbox = load(allocators::THREAD_ARENA, 128);
    sandbox.set_thread(ThreadId(2));
    assert_eq!(sandbox.thread(), ThreadId(2));
    assert_eq!(sandbox.malloc(4), Ok(64));
    sandbox.set_thread(ThreadId(0));
    assert_eq!(sandbox.malloc(4), Ok(0));
    sandbox.set_thread(ThreadId(2));
    assert_eq!(sandbox.malloc(4), Ok(68));
}

#[test]
fn options_are_read_from_the_bag() {
    let plain = SandboxOptions::with_capacity(64);
    let mut sandbox = Sandbox::load(allocators::OPTION_READER, plain.clone()).unwrap();
    assert_eq!(sandbox.malloc(3), Ok(0));
    assert_eq!(sandbox.malloc(1), Ok(3));

    let mut aligned = Sandbox::load(allocators::OPTION_READER, plain.option("align", "4")).unwrap();
    assert_eq!(aligned.malloc(3), Ok(0));
    assert_eq!(aligned.malloc(1), Ok(4));
}

#[test]
fn sandboxes_do_not_share_queues() {
    let mut a = load(allocators::ANNOTATING, 16);
    let mut b = load(allocators::ANNOTATING, 16);
    a.drain_annotations();
    a.malloc(2).unwrap();
    assert_eq!(a.pending_annotations(), 1);
    assert_eq!(b.pending_annotations(), 1);
    assert_eq!(b.drain_annotations(), vec![Annotation::text(0, "heap")]);
    assert_eq!(b.malloc(2), Ok(0));
}

#[test]
fn capacity_is_what_the_guest_sees() {
    let mut sandbox = load(allocators::OUT_OF_BOUNDS, 40);
    assert_eq!(sandbox.capacity(), 40);
    assert_eq!(sandbox.malloc(1), Ok(40));
}

// ── Debug echo ──────────────────────────────────────────────────────

/// Collects `(level, message)` for every event on the guest target.
#[derive(Clone, Default)]
struct GuestEcho(Arc<Mutex<Vec<(Level, String)>>>);

struct Message(String);

impl Visit for Message {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for GuestEcho {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != "heapreel::guest" {
            return;
        }
        let mut message = Message(String::new());
        event.record(&mut message);
        self.0
            .lock()
            .unwrap()
            .push((*event.metadata().level(), message.0));
    }
}

/// Run one malloc/free pair on [`allocators::ANNOTATING`] and return the
/// echoed events and the number of queued log entries.
fn echo_run(debug: bool) -> (Vec<(Level, String)>, usize) {
    let echo = GuestEcho::default();
    let subscriber = tracing_subscriber::registry().with(echo.clone());
    let queued = tracing::subscriber::with_default(subscriber, || {
        let options = SandboxOptions {
            debug,
            ..SandboxOptions::with_capacity(16)
        };
        let mut sandbox = Sandbox::load(allocators::ANNOTATING, options).unwrap();
        sandbox.malloc(4).unwrap();
        sandbox.free(0).unwrap();
        sandbox.drain_logs().len()
    });
    let events = echo.0.lock().unwrap().clone();
    (events, queued)
}

#[test]
fn debug_mode_echoes_guest_logs() {
    let (events, queued) = echo_run(true);
    assert_eq!(
        events,
        vec![
            (Level::INFO, "malloc".to_string()),
            (Level::WARN, "free".to_string())
        ]
    );
    assert_eq!(queued, 2);
}

#[test]
fn guest_logs_are_quiet_without_debug() {
    let (events, queued) = echo_run(false);
    assert!(events.is_empty(), "{events:?}");
    assert_eq!(queued, 2);
}
