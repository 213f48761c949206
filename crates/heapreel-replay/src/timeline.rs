//! The seekable replay timeline.

use heapreel_core::{Call, Micros, Op, Trace};

use crate::error::ReplayError;
use crate::segment::{build_segments, Segment};
use crate::state::{Overlay, ReplayState};
use crate::view::{CellPaint, MemoryView};

/// A trace bound to a memory view, seekable to any point in time.
///
/// The replay owns the trace. Every seek rebuilds the state at the
/// target time by folding all reached segments forward from a blank
/// state, so the result depends only on the target and never on where
/// the previous seek left off. Simultaneous mutations therefore always
/// resolve in trace order, scrubbing forward or backward alike.
///
/// After each seek, cell appearance is recomputed and only cells whose
/// appearance changed are painted.
///
/// Stepping works in *steps*: the distinct start times of the trace.
/// Calls that start at the same instant (every thread's first operation,
/// for one) belong to one step, because no seek can show one of them
/// without the others. [`next`](Self::next), [`prev`](Self::prev),
/// [`position`](Self::position) and [`alt_position`](Self::alt_position)
/// all count steps.
pub struct Replay<V: MemoryView> {
    trace: Trace,
    segments: Vec<Segment>,
    /// Distinct segment starts, ascending.
    steps: Vec<Micros>,
    view: V,
    /// One handle per address.
    handles: Vec<V::Handle>,
    state: ReplayState,
    painted: Vec<CellPaint>,
    time: Micros,
    total: Micros,
    progress: f64,
    reached: usize,
}

impl<V: MemoryView> Replay<V> {
    /// Bind `trace` to `view` and paint the state at time zero.
    ///
    /// # Errors
    ///
    /// [`ReplayError::View`] if any call touches cells outside the view,
    /// [`ReplayError::Validation`] for a malformed annotation, and the
    /// segment errors of [`build_segments`].
    pub fn new(trace: Trace, mut view: V) -> Result<Self, ReplayError> {
        let capacity = view.capacity();
        for call in &trace {
            if let Op::Annotate(a) = &call.op {
                a.validate(capacity)?;
            }
        }
        let segments = build_segments(&trace)?;
        for segment in &segments {
            if let Some((address, size)) = segment.mutation.span() {
                view.cells(address, size)?;
            }
        }
        let handles = view.cells(0, capacity)?;

        let total = trace.total_duration();
        let state = fold(&segments, capacity, Micros::ZERO);
        let painted = state.recompute();
        for (handle, paint) in handles.iter().zip(&painted) {
            view.paint(*handle, *paint);
        }
        let reached = reached(&segments, Micros::ZERO);
        let mut steps: Vec<Micros> = segments.iter().map(|s| s.start).collect();
        steps.dedup();
        tracing::debug!(
            calls = trace.len(),
            capacity,
            total_us = total.0,
            "replay ready"
        );
        Ok(Self {
            trace,
            segments,
            steps,
            view,
            handles,
            state,
            painted,
            time: Micros::ZERO,
            total,
            progress: 0.0,
            reached,
        })
    }

    // ── Seeking ────────────────────────────────────────────────────

    /// Current progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Seek to `p * total_duration`, with `p` clamped to `[0, 1]`.
    ///
    /// Re-issuing the current progress does nothing.
    ///
    /// # Errors
    ///
    /// [`ReplayError::InvalidProgress`] if `p` is NaN.
    pub fn set_progress(&mut self, p: f64) -> Result<(), ReplayError> {
        if p.is_nan() {
            return Err(ReplayError::InvalidProgress { value: p });
        }
        let p = p.clamp(0.0, 1.0);
        if p == self.progress {
            return Ok(());
        }
        let t = Micros((p * self.total.0 as f64).round() as u64);
        self.resolve(t);
        self.progress = p;
        Ok(())
    }

    /// Seek to time `t`, clamped to the trace.
    pub fn seek(&mut self, t: Micros) {
        let t = t.min(self.total);
        self.resolve(t);
        self.progress = self.progress_at(t);
    }

    /// Seek to the next step after the current time, or to the end of
    /// the trace (progress 1).
    pub fn next(&mut self) {
        match self.steps.iter().copied().find(|&start| start > self.time) {
            Some(start) => self.seek(start),
            None => {
                self.resolve(self.total);
                self.progress = 1.0;
            }
        }
    }

    /// Seek to the last step before the current time, or to zero
    /// (progress 0).
    pub fn prev(&mut self) {
        match self.steps.iter().rev().copied().find(|&start| start < self.time) {
            Some(start) => self.seek(start),
            None => {
                self.resolve(Micros::ZERO);
                self.progress = 0.0;
            }
        }
    }

    fn progress_at(&self, t: Micros) -> f64 {
        if self.total == Micros::ZERO {
            return if t == Micros::ZERO { 0.0 } else { 1.0 };
        }
        t.0 as f64 / self.total.0 as f64
    }

    fn resolve(&mut self, t: Micros) {
        self.time = t;
        self.state = fold(&self.segments, self.view.capacity(), t);
        self.reached = reached(&self.segments, t);
        let paints = self.state.recompute();
        let mut changed = 0usize;
        for ((handle, new), old) in self.handles.iter().zip(&paints).zip(&self.painted) {
            if new != old {
                self.view.paint(*handle, *new);
                changed += 1;
            }
        }
        self.painted = paints;
        tracing::trace!(time_us = t.0, reached = self.reached, changed, "seek");
    }

    // ── Positions ──────────────────────────────────────────────────

    /// Index of the first step not yet reached, clamped to the last
    /// step.
    pub fn position(&self) -> usize {
        self.reached_steps().min(self.steps.len().saturating_sub(1))
    }

    /// Index of the last step already reached, clamped to the first
    /// step.
    pub fn alt_position(&self) -> usize {
        self.reached_steps().saturating_sub(1)
    }

    /// Number of distinct start times in the trace.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    fn reached_steps(&self) -> usize {
        self.steps.partition_point(|&start| start <= self.time)
    }

    /// Number of calls whose start has been reached.
    pub fn reached(&self) -> usize {
        self.reached
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// Current time.
    pub fn time(&self) -> Micros {
        self.time
    }

    /// Latest end time over all calls.
    pub fn total_duration(&self) -> Micros {
        self.total
    }

    /// The replayed calls.
    pub fn calls(&self) -> &[Call] {
        self.trace.calls()
    }

    /// One replayed call.
    pub fn call(&self, index: usize) -> Option<&Call> {
        self.trace.calls().get(index)
    }

    /// The trace being replayed.
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// State at the current time.
    pub fn state(&self) -> &ReplayState {
        &self.state
    }

    /// Annotation marks at the current time.
    pub fn overlay(&self) -> &Overlay {
        self.state.overlay()
    }

    /// The memory view.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Release the memory view.
    pub fn into_view(self) -> V {
        self.view
    }
}

fn fold(segments: &[Segment], capacity: u32, t: Micros) -> ReplayState {
    let mut state = ReplayState::new(capacity);
    for segment in segments {
        // Segments are sorted by start; everything after is unreached.
        let Some(fraction) = segment.fraction(t) else {
            break;
        };
        state.apply(&segment.mutation, fraction);
    }
    state
}

fn reached(segments: &[Segment], t: Micros) -> usize {
    segments.partition_point(|s| s.start <= t)
}

impl<V: MemoryView + std::fmt::Debug> std::fmt::Debug for Replay<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replay")
            .field("calls", &self.trace.len())
            .field("time", &self.time)
            .field("total", &self.total)
            .field("progress", &self.progress)
            .field("view", &self.view)
            .finish()
    }
}
