//! Trace comparison for determinism checks.
//!
//! Hash-first: equal trace hashes short-circuit. On mismatch, calls are
//! compared pairwise to find the first divergence.

use heapreel_core::{Call, Trace};

use crate::hash::{call_hash, trace_hash};

/// The first point at which two traces disagree.
#[derive(Clone, Debug, PartialEq)]
pub struct TraceDivergence {
    /// Index of the first differing call.
    pub index: usize,
    /// The call in the recorded trace, `None` if it ended first.
    pub recorded: Option<Call>,
    /// The call in the replayed trace, `None` if it ended first.
    pub replayed: Option<Call>,
}

/// Compare a replayed trace against a recorded one.
///
/// Returns `None` if they are identical.
pub fn compare_traces(recorded: &Trace, replayed: &Trace) -> Option<TraceDivergence> {
    if recorded.len() == replayed.len() && trace_hash(recorded) == trace_hash(replayed) {
        return None;
    }
    let (rec, rep) = (recorded.calls(), replayed.calls());
    let index = rec
        .iter()
        .zip(rep)
        .position(|(a, b)| call_hash(a) != call_hash(b) || a != b)
        .unwrap_or_else(|| rec.len().min(rep.len()));
    if index == rec.len() && index == rep.len() {
        return None;
    }
    Some(TraceDivergence {
        index,
        recorded: rec.get(index).cloned(),
        replayed: rep.get(index).cloned(),
    })
}
