//! Core types and traits for the heapreel allocator visualizer.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the data model shared by the workload compiler, the sandbox, the
//! execution engine, and the replay engine: timeline positions,
//! identifiers, calls, annotations, traces, error types, and the
//! [`AllocatorHost`] trait.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod annotation;
pub mod call;
pub mod error;
pub mod id;
pub mod time;
pub mod trace;
pub mod traits;

pub use annotation::{check_range, Annotation, AnnotationKind};
pub use call::{Call, LogEntry, LogLevel, Op};
pub use error::{HostError, ValidationError};
pub use id::{AllocationKey, Color, ThreadId};
pub use time::Micros;
pub use trace::Trace;
pub use traits::AllocatorHost;
