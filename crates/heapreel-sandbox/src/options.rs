//! The options bag handed to a sandbox at construction.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SandboxError;

/// One wasm page.
const WASM_PAGE: usize = 64 * 1024;

/// Construction parameters for a [`Sandbox`](crate::Sandbox).
///
/// Serializes as a flat object: the known keys plus every
/// allocator-specific option as a string-valued sibling.
///
/// ```
/// use heapreel_sandbox::SandboxOptions;
///
/// let opts: SandboxOptions =
///     serde_json::from_str(r#"{"capacity": 64, "debug": true, "strategy": "best-fit"}"#).unwrap();
/// assert_eq!(opts.capacity, 64);
/// assert_eq!(opts.extra["strategy"], "best-fit");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxOptions {
    /// Size of the simulated address space in bytes. Default: 256.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Echo guest log messages through `tracing` as they are queued.
    #[serde(default)]
    pub debug: bool,
    /// Instruction budget per call (including the start function).
    /// `None` disables metering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel: Option<u64>,
    /// Upper bound on guest linear memory in bytes. Default: 16 MiB.
    #[serde(default = "default_memory_limit")]
    pub memory_limit: usize,
    /// Allocator-specific options, readable by the guest through
    /// `optionLength` / `readOption`.
    #[serde(flatten)]
    pub extra: IndexMap<String, String>,
}

fn default_capacity() -> u32 {
    256
}

fn default_memory_limit() -> usize {
    16 * 1024 * 1024
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            debug: false,
            fuel: None,
            memory_limit: default_memory_limit(),
            extra: IndexMap::new(),
        }
    }
}

impl SandboxOptions {
    /// Options for an address space of `capacity` bytes.
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Add an allocator-specific option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Check that the options describe a usable sandbox.
    ///
    /// Addresses cross the wasm boundary as `i32`, so the capacity must
    /// fit in one.
    pub fn validate(&self) -> Result<(), SandboxError> {
        if self.capacity == 0 {
            return Err(SandboxError::InvalidOptions {
                reason: "capacity must be at least 1 byte".into(),
            });
        }
        if self.capacity > i32::MAX as u32 {
            return Err(SandboxError::InvalidOptions {
                reason: format!("capacity {} exceeds {}", self.capacity, i32::MAX),
            });
        }
        if self.fuel == Some(0) {
            return Err(SandboxError::InvalidOptions {
                reason: "fuel budget must be positive".into(),
            });
        }
        if self.memory_limit < WASM_PAGE {
            return Err(SandboxError::InvalidOptions {
                reason: format!("memory_limit must be at least one page ({WASM_PAGE} bytes)"),
            });
        }
        Ok(())
    }
}
