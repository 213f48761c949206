//! Deterministic seekable replay of heapreel allocator traces.
//!
//! Converts an executed [`Trace`](heapreel_core::Trace) into a timeline
//! that can be seeked to any progress in `[0, 1]` or stepped one event
//! at a time, and paints the resulting memory state through a
//! caller-supplied [`MemoryView`].
//!
//! # Architecture
//!
//! - [`build_segments`] turns each call into a [`Segment`] with a
//!   [`Mutation`]
//! - [`Replay`] folds reached segments into a [`ReplayState`] and paints
//!   changed cells
//! - [`write_trace`] / [`read_trace`] persist traces as JSON
//! - [`trace_hash`] and [`compare_traces`] verify determinism

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod compare;
pub mod error;
pub mod hash;
pub mod segment;
pub mod state;
pub mod timeline;
pub mod view;

pub use codec::{from_json, read_trace, to_json, write_trace};
pub use compare::{compare_traces, TraceDivergence};
pub use error::{ReplayError, ViewError};
pub use hash::{call_hash, state_hash, trace_hash};
pub use segment::{build_segments, Mutation, Segment};
pub use state::{CellState, ColorMark, Overlay, RangeMark, ReplayState};
pub use timeline::Replay;
pub use view::{check_cells, CellPaint, Highlight, MemoryView};
