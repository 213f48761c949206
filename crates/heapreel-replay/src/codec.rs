//! JSON encoding of traces.
//!
//! A trace file is a JSON array of call objects in trace order, using
//! the wire names of [`Call`](heapreel_core::Call). Reading checks the
//! `(time, thread)` ordering invariant and reports a violation as
//! [`ReplayError::Validation`] rather than a codec failure.

use std::io::{Read, Write};

use heapreel_core::{Call, Trace};

use crate::error::ReplayError;

/// Write `trace` to `writer` as pretty-printed JSON.
pub fn write_trace<W: Write>(trace: &Trace, mut writer: W) -> Result<(), ReplayError> {
    serde_json::to_writer_pretty(&mut writer, trace)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Read a trace written by [`write_trace`].
pub fn read_trace<R: Read>(reader: R) -> Result<Trace, ReplayError> {
    let calls: Vec<Call> = serde_json::from_reader(reader)?;
    Ok(Trace::new(calls)?)
}

/// Encode `trace` as compact JSON.
pub fn to_json(trace: &Trace) -> Result<String, ReplayError> {
    Ok(serde_json::to_string(trace)?)
}

/// Decode a trace from JSON text.
pub fn from_json(json: &str) -> Result<Trace, ReplayError> {
    let calls: Vec<Call> = serde_json::from_str(json)?;
    Ok(Trace::new(calls)?)
}
