//! Errors raised while constructing a sandbox.
//!
//! Failures while *calling* into a loaded allocator are reported as
//! [`HostError`](heapreel_core::HostError) through the
//! [`AllocatorHost`](heapreel_core::AllocatorHost) trait.

use std::error::Error;
use std::fmt;

/// The phase of loading that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadStage {
    /// The source is neither valid WebAssembly text nor binary.
    Parse,
    /// The engine rejected the module (validation, configuration).
    Compile,
    /// An import is outside the binding allowlist or has the wrong type.
    Link,
    /// The store could not be set up, or instantiation failed: the
    /// initial memory exceeds the limit or the start function trapped.
    Start,
    /// A required export has the wrong signature.
    Exports,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Parse => "parse",
            Self::Compile => "compile",
            Self::Link => "link",
            Self::Start => "start",
            Self::Exports => "exports",
        })
    }
}

/// A sandbox could not be constructed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SandboxError {
    /// The allocator source failed to load or initialize.
    Load {
        /// Where loading stopped.
        stage: LoadStage,
        /// Engine-provided detail.
        reason: String,
    },
    /// The options bag is unusable.
    InvalidOptions {
        /// Which option is wrong.
        reason: String,
    },
}

impl SandboxError {
    pub(crate) fn load(stage: LoadStage, err: impl fmt::Display) -> Self {
        Self::Load {
            stage,
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for SandboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { stage, reason } => {
                write!(f, "failed to load allocator ({stage}): {reason}")
            }
            Self::InvalidOptions { reason } => write!(f, "invalid sandbox options: {reason}"),
        }
    }
}

impl Error for SandboxError {}
