//! Error types shared across the heapreel workspace.
//!
//! [`ValidationError`] covers malformed values discovered anywhere in the
//! pipeline (addresses, sizes, colors, ordering). [`HostError`] is what an
//! [`AllocatorHost`](crate::traits::AllocatorHost) reports when invoking
//! allocator code fails.

use std::error::Error;
use std::fmt;

/// A value failed validation.
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationError {
    /// A range extends past the configured address space.
    AddressOutOfRange {
        /// First byte of the range.
        address: i64,
        /// Length of the range in bytes.
        size: u32,
        /// Size of the address space.
        capacity: u32,
    },
    /// A size of zero (or otherwise unusable) was supplied.
    InvalidSize {
        /// The rejected size.
        size: i64,
    },
    /// A color has bits above `0xFFFFFF` or is negative.
    InvalidColor {
        /// The rejected value.
        value: i64,
    },
    /// An alpha value outside `[0, 1]` or not finite.
    InvalidAlpha {
        /// The rejected value.
        value: f64,
    },
    /// A trace is not sorted by `(time, thread)`.
    UnsortedTrace {
        /// Index of the first call that sorts before its predecessor.
        index: usize,
    },
    /// An allocation id is still live and was allocated again.
    DuplicateAllocationId {
        /// The duplicated key, rendered.
        id: String,
    },
    /// An annotation is missing a field its type requires.
    IncompleteAnnotation {
        /// The annotation type.
        kind: &'static str,
        /// The missing field.
        field: &'static str,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressOutOfRange {
                address,
                size,
                capacity,
            } => write!(
                f,
                "range [{address}, {address}+{size}) lies outside address space of {capacity} bytes"
            ),
            Self::InvalidSize { size } => write!(f, "invalid size {size}"),
            Self::InvalidColor { value } => {
                write!(f, "invalid color {value:#x} (must be 0..=0xffffff)")
            }
            Self::InvalidAlpha { value } => write!(f, "alpha must lie in [0, 1], got {value}"),
            Self::UnsortedTrace { index } => {
                write!(f, "trace is not sorted by (time, thread) at call {index}")
            }
            Self::DuplicateAllocationId { id } => {
                write!(f, "allocation id '{id}' is already live")
            }
            Self::IncompleteAnnotation { kind, field } => {
                write!(f, "{kind} annotation requires '{field}'")
            }
        }
    }
}

impl Error for ValidationError {}

/// Invoking allocator code failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostError {
    /// The allocator does not export a required function.
    NotImplemented {
        /// Name of the missing export (`"malloc"` or `"free"`).
        export: &'static str,
    },
    /// The allocator trapped (unreachable, out-of-bounds access, fuel exhausted, ...).
    Trap {
        /// Engine-provided description of the trap.
        reason: String,
    },
    /// A host binding was called with arguments it could not honor,
    /// e.g. a string pointer outside guest memory.
    Fault {
        /// Which binding faulted and why.
        reason: String,
    },
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotImplemented { export } => {
                write!(f, "allocator does not implement '{export}'")
            }
            Self::Trap { reason } => write!(f, "allocator trapped: {reason}"),
            Self::Fault { reason } => write!(f, "host binding fault: {reason}"),
        }
    }
}

impl Error for HostError {}
