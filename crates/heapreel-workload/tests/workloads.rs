//! End-to-end compilation of JSON workloads.

use heapreel_core::{AllocationKey, Annotation, Color, Micros, Op, ThreadId, Trace};
use heapreel_workload::{compile_json, CompileError, CompilerConfig};

const TWO_THREADS: &str = r##"[
    {"element": "thread", "children": [
        {"element": "malloc", "attributes": {"id": "a", "size": "8", "color": "#ff0000"}},
        {"element": "sleep", "attributes": {"duration": "1s"}},
        {"element": "free", "attributes": {"id": "a", "duration": "250"}}
    ]},
    {"element": "thread", "children": [
        {"element": "malloc", "attributes": {"id": "a", "size": "4", "addr": "0x0c"}},
        {"element": "annotate", "attributes": {"type": "text", "address": "12", "text": "pinned"}}
    ]}
]"##;

#[test]
fn two_thread_workload_compiles_in_order() {
    let calls = compile_json(TWO_THREADS, &CompilerConfig::default()).unwrap();
    let summary: Vec<_> = calls
        .iter()
        .map(|c| (c.thread_id, c.time, c.op.name()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (ThreadId(0), Micros(1), "malloc"),
            (ThreadId(1), Micros(1), "malloc"),
            (ThreadId(0), Micros(500_001), "sleep"),
            (ThreadId(1), Micros(500_001), "annotate"),
            (ThreadId(0), Micros(1_500_001), "free"),
        ]
    );
    assert!(Trace::new(calls).is_ok());
}

#[test]
fn ids_are_namespaced_per_thread() {
    let calls = compile_json(TWO_THREADS, &CompilerConfig::default()).unwrap();
    assert_eq!(calls[0].id, Some(AllocationKey::Named("0-a".into())));
    assert_eq!(calls[1].id, Some(AllocationKey::Named("1-a".into())));
    assert_eq!(
        calls[0].op,
        Op::Malloc {
            size: 8,
            addr: None,
            color: Some(Color::from_rgb(0xff0000)),
        }
    );
    assert_eq!(
        calls[1].op,
        Op::Malloc {
            size: 4,
            addr: Some(12),
            color: None,
        }
    );
    assert_eq!(calls[3].op, Op::Annotate(Annotation::text(12, "pinned")));
    assert_eq!(calls[4].duration, Micros(250_000));
}

#[test]
fn custom_intervals_apply() {
    let config = CompilerConfig {
        default_interval: Micros::from_millis(10),
        start_offset: Micros(5),
    };
    let calls = compile_json(
        r#"[{"element": "malloc", "attributes": {"size": "1"}},
            {"element": "malloc", "attributes": {"size": "1"}}]"#,
        &config,
    )
    .unwrap();
    assert_eq!(calls[0].time, Micros(5));
    assert_eq!(calls[1].time, Micros(10_005));
    assert!(calls.iter().all(|c| c.thread_id == ThreadId(0)));
}

#[test]
fn errors_name_the_offending_attribute() {
    let err = compile_json(
        r#"[{"element": "thread", "children": [
            {"element": "malloc", "attributes": {"size": "12x"}}
        ]}]"#,
        &CompilerConfig::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        CompileError::InvalidAttribute {
            element: "malloc",
            attribute: "size",
            value: "12x".into(),
            reason: "expected an unsigned 32-bit integer".into(),
        }
    );
    assert_eq!(
        err.to_string(),
        "<malloc size=\"12x\">: expected an unsigned 32-bit integer"
    );
}

#[test]
fn unknown_elements_and_bad_json_fail() {
    assert_eq!(
        compile_json(
            r#"[{"element": "calloc"}]"#,
            &CompilerConfig::default()
        ),
        Err(CompileError::UnknownElement {
            element: "calloc".into()
        })
    );
    assert!(matches!(
        compile_json("[{", &CompilerConfig::default()),
        Err(CompileError::Parse { .. })
    ));
}
