//! Error types for the replay engine.

use std::error::Error;
use std::fmt;
use std::io;

use heapreel_core::ValidationError;

/// A memory view could not resolve a range of cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewError {
    /// The range extends past the cells the view displays.
    OutOfRange {
        /// First byte requested.
        address: u32,
        /// Number of bytes requested.
        size: u32,
        /// Number of cells in the view.
        capacity: u32,
    },
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange {
                address,
                size,
                capacity,
            } => write!(
                f,
                "cells [{address}, {address}+{size}) exceed a view of {capacity} cells"
            ),
        }
    }
}

impl Error for ViewError {}

/// Errors raised while building, seeking, or (de)serializing a replay.
#[derive(Debug)]
pub enum ReplayError {
    /// The memory view rejected a range.
    View(ViewError),
    /// Progress must be a number; NaN is rejected.
    InvalidProgress {
        /// The rejected value.
        value: f64,
    },
    /// A trace could not be encoded or decoded.
    Codec {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A trace violates an invariant (ordering, annotation shape).
    Validation(ValidationError),
    /// A malloc without a return address or a free without a resolved
    /// address: the trace was never executed.
    UnresolvedCall {
        /// Index of the call in the trace.
        index: usize,
    },
    /// A free releases an address no earlier malloc returned.
    UnmatchedFree {
        /// Index of the call in the trace.
        index: usize,
        /// The freed address.
        address: u32,
    },
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::View(e) => write!(f, "memory view: {e}"),
            Self::InvalidProgress { value } => {
                write!(f, "progress must be a number in [0, 1], got {value}")
            }
            Self::Codec { detail } => write!(f, "trace codec: {detail}"),
            Self::Validation(e) => write!(f, "invalid trace: {e}"),
            Self::UnresolvedCall { index } => {
                write!(f, "call {index} has no resolved address; run the trace first")
            }
            Self::UnmatchedFree { index, address } => {
                write!(f, "call {index} frees address {address} which is not allocated")
            }
        }
    }
}

impl Error for ReplayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::View(e) => Some(e),
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ViewError> for ReplayError {
    fn from(e: ViewError) -> Self {
        Self::View(e)
    }
}

impl From<ValidationError> for ReplayError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<serde_json::Error> for ReplayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Codec {
            detail: e.to_string(),
        }
    }
}

impl From<io::Error> for ReplayError {
    fn from(e: io::Error) -> Self {
        Self::Codec {
            detail: e.to_string(),
        }
    }
}
