//! heapreel: watch a user-written allocator run, then scrub through it.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all heapreel sub-crates. For most users, adding `heapreel` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use heapreel::prelude::*;
//!
//! // A bump allocator in WebAssembly text.
//! let allocator = r#"(module
//!     (global $next (mut i32) (i32.const 0))
//!     (memory (export "memory") 1)
//!     (func (export "malloc") (param $size i32) (result i32)
//!         (local $addr i32)
//!         (local.set $addr (global.get $next))
//!         (global.set $next (i32.add (global.get $next) (local.get $size)))
//!         (local.get $addr))
//!     (func (export "free") (param i32)))"#;
//!
//! let workload = r#"[
//!     {"element": "malloc", "attributes": {"id": "a", "size": "4"}},
//!     {"element": "malloc", "attributes": {"id": "b", "size": "2"}},
//!     {"element": "free", "attributes": {"id": "a"}}
//! ]"#;
//!
//! let calls = compile_json(workload, &CompilerConfig::default()).unwrap();
//! let sandbox = Sandbox::load(allocator, SandboxOptions::with_capacity(8)).unwrap();
//! let run = run(sandbox, calls, &EngineConfig::default()).unwrap();
//! assert_eq!(run.occupied, 2);
//!
//! // A view that just remembers what it was told to draw.
//! struct Cells(Vec<CellPaint>);
//! impl MemoryView for Cells {
//!     type Handle = usize;
//!     fn capacity(&self) -> u32 { self.0.len() as u32 }
//!     fn cells(&self, address: u32, size: u32) -> Result<Vec<usize>, ViewError> {
//!         heapreel::replay::check_cells(address, size, self.capacity())?;
//!         Ok((address as usize..(address + size) as usize).collect())
//!     }
//!     fn paint(&mut self, handle: usize, paint: CellPaint) { self.0[handle] = paint; }
//! }
//!
//! let mut replay = Replay::new(run.trace, Cells(vec![CellPaint::default(); 8])).unwrap();
//! replay.set_progress(1.0).unwrap();
//! let filled: Vec<bool> = replay.view().0.iter().map(|c| c.fill.is_some()).collect();
//! assert_eq!(filled, [false, false, false, false, true, true, false, false]);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `heapreel-core` | Calls, traces, annotations, ids, time, the host trait |
//! | [`workload`] | `heapreel-workload` | Workload nodes and the compiler |
//! | [`sandbox`] | `heapreel-sandbox` | The wasm allocator runtime |
//! | [`engine`] | `heapreel-engine` | Validated execution, occupancy tracking, timing |
//! | [`replay`] | `heapreel-replay` | Seekable replay, trace codec, hashing |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core data model (`heapreel-core`).
///
/// Contains [`types::Call`], [`types::Trace`], [`types::Annotation`],
/// the error types, and the [`types::AllocatorHost`] trait.
pub use heapreel_core as types;

/// Workload description and compilation (`heapreel-workload`).
pub use heapreel_workload as workload;

/// Sandboxed WebAssembly allocator runtime (`heapreel-sandbox`).
///
/// [`sandbox::Sandbox`] is the production [`types::AllocatorHost`].
pub use heapreel_sandbox as sandbox;

/// Validated execution (`heapreel-engine`).
///
/// [`engine::run`] for traced, checked runs; [`engine::time`] for raw
/// throughput.
pub use heapreel_engine as engine;

/// Seekable replay and trace persistence (`heapreel-replay`).
///
/// Bind a trace to a [`replay::MemoryView`] with [`replay::Replay`];
/// persist it with [`replay::write_trace`] / [`replay::read_trace`].
pub use heapreel_replay as replay;

/// Common imports for typical heapreel usage.
///
/// ```rust
/// use heapreel::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use heapreel_core::{
        AllocationKey, AllocatorHost, Annotation, AnnotationKind, Call, Color, LogEntry,
        LogLevel, Micros, Op, ThreadId, Trace,
    };

    // Errors
    pub use heapreel_core::{HostError, ValidationError};

    // Workload
    pub use heapreel_workload::{compile, compile_json, CompileError, CompilerConfig, Node};

    // Sandbox
    pub use heapreel_sandbox::{Sandbox, SandboxError, SandboxOptions};

    // Engine
    pub use heapreel_engine::{run, EngineConfig, ExecError, LogRecord, Run, RunError};

    // Replay
    pub use heapreel_replay::{CellPaint, MemoryView, Replay, ReplayError, ViewError};
}
