//! Validating execution engine for heapreel.
//!
//! Runs a compiled call list against an [`AllocatorHost`] (the wasm
//! sandbox in production, a native double in tests), checks every block
//! against a byte-occupancy [`Tracker`], and produces the annotated
//! [`Trace`] that the replay engine animates.
//!
//! # Architecture
//!
//! - [`run`] executes and validates, producing a [`Run`]
//! - [`Tracker`] is the per-run occupancy bitmap
//! - [`time`] measures raw allocator throughput without validation
//! - [`EngineConfig`] holds the default color palette
//!
//! [`AllocatorHost`]: heapreel_core::AllocatorHost
//! [`Trace`]: heapreel_core::Trace

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod execute;
pub mod log;
pub mod metrics;
pub mod timing;
pub mod tracker;

pub use config::{ConfigError, EngineConfig, DEFAULT_PALETTE};
pub use error::{ExecError, RunError, TrackerError};
pub use execute::{run, Allocation, Run};
pub use log::LogRecord;
pub use metrics::RunMetrics;
pub use timing::{time, Throughput};
pub use tracker::Tracker;
