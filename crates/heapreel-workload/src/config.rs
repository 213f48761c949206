//! Compiler configuration.

use heapreel_core::Micros;

use crate::error::CompileError;

// ── CompilerConfig ─────────────────────────────────────────────────

/// Timing parameters for [`compile`](crate::compile).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Duration of an operation with no explicit `duration`. Default: 500ms.
    pub default_interval: Micros,
    /// Time of the first operation in every thread. Default: 1µs.
    ///
    /// Must be positive so that workload operations sort after the
    /// time-zero setup annotations emitted while loading an allocator.
    pub start_offset: Micros,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_interval: Micros::from_millis(500),
            start_offset: Micros(1),
        }
    }
}

impl CompilerConfig {
    /// Check that both intervals are positive.
    pub fn validate(&self) -> Result<(), CompileError> {
        if self.default_interval == Micros::ZERO {
            return Err(CompileError::InvalidConfig {
                reason: "default_interval must be positive".into(),
            });
        }
        if self.start_offset == Micros::ZERO {
            return Err(CompileError::InvalidConfig {
                reason: "start_offset must be positive".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let cfg = CompilerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.default_interval, Micros(500_000));
    }

    #[test]
    fn zero_offset_rejected() {
        let cfg = CompilerConfig {
            start_offset: Micros::ZERO,
            ..CompilerConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(CompileError::InvalidConfig { .. })
        ));
    }
}
