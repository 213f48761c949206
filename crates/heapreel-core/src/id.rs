//! Strongly-typed identifiers: threads, colors, and allocation keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identifies a logical workload thread.
///
/// Threads are a scheduling abstraction only: they determine how call
/// timestamps interleave, never how calls execute.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ThreadId(pub u32);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ThreadId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// A 24-bit RGB color, `0xRRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Color(u32);

impl Color {
    /// Largest representable color value.
    pub const MAX: u32 = 0xFF_FF_FF;

    /// Build a color, rejecting values with bits above 24.
    pub fn new(rgb: u32) -> Result<Self, ValidationError> {
        if rgb > Self::MAX {
            return Err(ValidationError::InvalidColor { value: rgb as i64 });
        }
        Ok(Self(rgb))
    }

    /// Build a color from a compile-time constant.
    ///
    /// Bits above 24 are masked off.
    pub const fn from_rgb(rgb: u32) -> Self {
        Self(rgb & Self::MAX)
    }

    /// The raw `0xRRGGBB` value.
    pub const fn rgb(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Color {
    type Error = ValidationError;

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        Color::new(v)
    }
}

impl From<Color> for u32 {
    fn from(c: Color) -> u32 {
        c.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

/// Key under which a live allocation is tracked during a run.
///
/// Workload-named allocations are namespaced by their owning thread
/// (`"{thread}-{id}"`) so two threads may reuse the same local name.
/// Unnamed allocations are identified by the address the allocator
/// returned for them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllocationKey {
    /// A thread-namespaced workload id.
    Named(String),
    /// An allocation identified by its resolved address.
    Address(u32),
}

impl AllocationKey {
    /// Namespace a workload-local id by its owning thread.
    pub fn named(thread: ThreadId, local: &str) -> Self {
        AllocationKey::Named(format!("{thread}-{local}"))
    }
}

impl fmt::Display for AllocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::Address(addr) => write!(f, "@{addr}"),
        }
    }
}
