//! Engine configuration, validation, and error types.

use std::error::Error;
use std::fmt;

use heapreel_core::Color;
use serde::{Deserialize, Serialize};

/// Colors handed to allocations that do not name one, in rotation.
pub const DEFAULT_PALETTE: [Color; 8] = [
    Color::from_rgb(0x4c8bf5),
    Color::from_rgb(0xf5a04c),
    Color::from_rgb(0x5cc46a),
    Color::from_rgb(0xe0565b),
    Color::from_rgb(0x9b6ad6),
    Color::from_rgb(0x4cc9c0),
    Color::from_rgb(0xd6a84c),
    Color::from_rgb(0x8c8c8c),
];

// ── EngineConfig ───────────────────────────────────────────────────

/// Settings for [`run`](crate::run).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// The n-th malloc without an explicit color gets
    /// `palette[n % palette.len()]`. Must not be empty.
    pub palette: Vec<Color>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.to_vec(),
        }
    }
}

impl EngineConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.palette.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        Ok(())
    }

    /// Color for the `n`-th uncolored malloc of a run.
    ///
    /// Falls back to the first default color if the palette is empty;
    /// [`validate`](Self::validate) rejects that case up front.
    pub fn color(&self, n: usize) -> Color {
        match self.palette.len() {
            0 => DEFAULT_PALETTE[0],
            len => self.palette[n % len],
        }
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`EngineConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The palette has no colors.
    EmptyPalette,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPalette => write!(f, "palette must contain at least one color"),
        }
    }
}

impl Error for ConfigError {}
