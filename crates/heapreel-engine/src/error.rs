//! Engine error types.
//!
//! [`TrackerError`] is raised by the occupancy bitmap, [`ExecError`] by
//! a single call, and [`RunError`] wraps the first `ExecError` of a run
//! together with where it happened and the log trail up to that point.

use std::error::Error;
use std::fmt;

use heapreel_core::{HostError, ValidationError};

use crate::config::ConfigError;
use crate::log::LogRecord;

// ── TrackerError ───────────────────────────────────────────────────

/// Occupancy bookkeeping rejected a range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackerError {
    /// A byte in the range is already occupied.
    DoubleAllocation {
        /// First conflicting byte.
        address: u32,
    },
    /// A byte in the range is not occupied.
    DoubleFree {
        /// First conflicting byte.
        address: u32,
    },
    /// The range extends past the tracked address space.
    OutOfBounds {
        /// First byte of the range.
        address: u32,
        /// Length of the range.
        size: u32,
        /// Size of the address space.
        capacity: u32,
    },
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DoubleAllocation { address } => {
                write!(f, "byte {address} is already allocated")
            }
            Self::DoubleFree { address } => write!(f, "byte {address} is not allocated"),
            Self::OutOfBounds {
                address,
                size,
                capacity,
            } => write!(
                f,
                "range [{address}, {address}+{size}) exceeds capacity {capacity}"
            ),
        }
    }
}

impl Error for TrackerError {}

// ── ExecError ──────────────────────────────────────────────────────

/// Executing one call failed.
#[derive(Clone, Debug, PartialEq)]
pub enum ExecError {
    /// A value in the call, or an annotation the allocator emitted, is
    /// malformed.
    Validation(ValidationError),
    /// The allocator returned a block overlapping a live one.
    DoubleAllocation {
        /// First overlapping byte.
        address: u32,
    },
    /// A free released bytes that were not allocated.
    DoubleFree {
        /// First byte that was already clear.
        address: u32,
    },
    /// `malloc` reported failure or returned a block that does not fit.
    OutOfMemory {
        /// Requested size.
        size: u32,
        /// Raw value the allocator returned.
        returned: i64,
        /// Size of the address space.
        capacity: u32,
    },
    /// The allocator lacks a required export.
    NotImplemented {
        /// `"malloc"` or `"free"`.
        export: &'static str,
    },
    /// A free names an allocation that is not live.
    UnknownAllocationId {
        /// The key, rendered.
        id: String,
    },
    /// The allocator trapped or misused a binding.
    Host(HostError),
    /// The engine configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "validation: {e}"),
            Self::DoubleAllocation { address } => {
                write!(f, "double allocation: byte {address} is already in use")
            }
            Self::DoubleFree { address } => {
                write!(f, "double free: byte {address} is not allocated")
            }
            Self::OutOfMemory {
                size,
                returned,
                capacity,
            } => {
                if *returned < 0 {
                    write!(f, "out of memory: malloc({size}) returned {returned}")
                } else {
                    write!(
                        f,
                        "out of memory: malloc({size}) returned {returned}, \
                         which does not fit in {capacity} bytes"
                    )
                }
            }
            Self::NotImplemented { export } => {
                write!(f, "allocator does not implement '{export}'")
            }
            Self::UnknownAllocationId { id } => write!(f, "no live allocation '{id}'"),
            Self::Host(e) => write!(f, "{e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl Error for ExecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(e) => Some(e),
            Self::Host(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValidationError> for ExecError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<ConfigError> for ExecError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<HostError> for ExecError {
    fn from(e: HostError) -> Self {
        match e {
            HostError::NotImplemented { export } => Self::NotImplemented { export },
            other => Self::Host(other),
        }
    }
}

impl From<TrackerError> for ExecError {
    fn from(e: TrackerError) -> Self {
        match e {
            TrackerError::DoubleAllocation { address } => Self::DoubleAllocation { address },
            TrackerError::DoubleFree { address } => Self::DoubleFree { address },
            TrackerError::OutOfBounds {
                address,
                size,
                capacity,
            } => Self::Validation(ValidationError::AddressOutOfRange {
                address: i64::from(address),
                size,
                capacity,
            }),
        }
    }
}

// ── RunError ───────────────────────────────────────────────────────

/// A run aborted.
///
/// The partial trace is discarded; the log trail up to and including the
/// failing call is kept.
#[derive(Clone, Debug, PartialEq)]
pub struct RunError {
    /// What went wrong.
    pub kind: ExecError,
    /// Index into the input call list of the failing call, `None` for
    /// failures before the first call (configuration, setup annotations).
    pub call_index: Option<usize>,
    /// Log messages emitted before the failure.
    pub logs: Vec<LogRecord>,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.call_index {
            Some(i) => write!(f, "call {i}: {}", self.kind),
            None => write!(f, "setup: {}", self.kind),
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_implemented_host_errors_are_lifted() {
        assert_eq!(
            ExecError::from(HostError::NotImplemented { export: "free" }),
            ExecError::NotImplemented { export: "free" }
        );
        let trap = HostError::Trap {
            reason: "unreachable".into(),
        };
        assert_eq!(ExecError::from(trap.clone()), ExecError::Host(trap));
    }

    #[test]
    fn tracker_bounds_become_validation_errors() {
        let e = ExecError::from(TrackerError::OutOfBounds {
            address: 10,
            size: 8,
            capacity: 16,
        });
        assert!(matches!(
            e,
            ExecError::Validation(ValidationError::AddressOutOfRange { address: 10, .. })
        ));
    }

    #[test]
    fn run_error_names_the_call() {
        let e = RunError {
            kind: ExecError::UnknownAllocationId { id: "@5".into() },
            call_index: Some(3),
            logs: Vec::new(),
        };
        assert_eq!(e.to_string(), "call 3: no live allocation '@5'");
        assert!(e.source().is_some());
    }
}
