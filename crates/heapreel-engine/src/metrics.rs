//! Per-run counters.

use serde::Serialize;

/// Counters collected during a single run.
///
/// Wall time is in microseconds. Every other field counts calls in the
/// output trace, synthetic annotate calls included.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunMetrics {
    /// Calls in the output trace.
    pub calls: usize,
    /// Malloc calls.
    pub mallocs: usize,
    /// Free calls.
    pub frees: usize,
    /// Annotate calls, workload-supplied and allocator-emitted.
    pub annotations: usize,
    /// Log messages drained from the allocator.
    pub log_entries: usize,
    /// Wall-clock time for the entire run, in microseconds.
    pub wall_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = RunMetrics::default();
        assert_eq!(m.calls, 0);
        assert_eq!(m.mallocs, 0);
        assert_eq!(m.frees, 0);
        assert_eq!(m.annotations, 0);
        assert_eq!(m.log_entries, 0);
        assert_eq!(m.wall_us, 0);
    }
}
