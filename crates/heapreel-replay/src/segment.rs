//! Timeline segments: one per call, each spanning `[time, time + duration]`.

use std::collections::HashMap;

use heapreel_core::{Annotation, Call, Color, Micros, Op, Trace};

use crate::error::ReplayError;

/// Fill color for allocations that reached the replay without one.
pub const DEFAULT_FILL: Color = Color::from_rgb(0x4c8b_f5);

/// The state change a segment applies as it plays.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    /// Fade an allocation in over `[address, address + size)`.
    Fill {
        /// First byte.
        address: u32,
        /// Bytes covered.
        size: u32,
        /// Allocation color.
        color: Color,
    },
    /// Fade an allocation out; the cells are empty once it completes.
    Clear {
        /// First byte.
        address: u32,
        /// Bytes covered.
        size: u32,
    },
    /// Add or remove an overlay mark.
    Annotate(Annotation),
    /// Time passes; nothing changes.
    Idle,
}

impl Mutation {
    /// Cells this mutation touches, as `(address, size)`.
    pub fn span(&self) -> Option<(u32, u32)> {
        match self {
            Self::Fill { address, size, .. } | Self::Clear { address, size } => {
                Some((*address, *size))
            }
            Self::Annotate(a) => Some((a.address, a.extent())),
            Self::Idle => None,
        }
    }
}

/// One event on the timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    /// Index of the originating call in the trace.
    pub call: usize,
    /// Time the segment is reached.
    pub start: Micros,
    /// Time the segment completes.
    pub end: Micros,
    /// What it does.
    pub mutation: Mutation,
}

impl Segment {
    /// How far the segment has played at time `t`.
    ///
    /// `None` before `start`; `1.0` at or after `end` and for
    /// zero-length segments; linear in between.
    pub fn fraction(&self, t: Micros) -> Option<f64> {
        if t < self.start {
            return None;
        }
        if t >= self.end || self.end == self.start {
            return Some(1.0);
        }
        let elapsed = (t - self.start).0 as f64;
        let span = (self.end - self.start).0 as f64;
        Some(elapsed / span)
    }
}

/// Build the segment list of an executed trace.
///
/// Frees carry only an address; their extent is recovered from the
/// malloc that returned it.
///
/// # Errors
///
/// [`ReplayError::UnresolvedCall`] for calls that were never executed,
/// [`ReplayError::UnmatchedFree`] for a free of an address with no live
/// malloc.
pub fn build_segments(trace: &Trace) -> Result<Vec<Segment>, ReplayError> {
    let mut live: HashMap<u32, u32> = HashMap::new();
    trace
        .calls()
        .iter()
        .enumerate()
        .map(|(index, call)| {
            let mutation = mutation(index, call, &mut live)?;
            Ok(Segment {
                call: index,
                start: call.time,
                end: call.end(),
                mutation,
            })
        })
        .collect()
}

fn mutation(
    index: usize,
    call: &Call,
    live: &mut HashMap<u32, u32>,
) -> Result<Mutation, ReplayError> {
    match &call.op {
        Op::Malloc { size, color, .. } => {
            let address = call.ret.ok_or(ReplayError::UnresolvedCall { index })?;
            live.insert(address, *size);
            Ok(Mutation::Fill {
                address,
                size: *size,
                color: color.unwrap_or(DEFAULT_FILL),
            })
        }
        Op::Free { address, .. } => {
            let address = address.ok_or(ReplayError::UnresolvedCall { index })?;
            let size = live
                .remove(&address)
                .ok_or(ReplayError::UnmatchedFree { index, address })?;
            Ok(Mutation::Clear { address, size })
        }
        Op::Sleep => Ok(Mutation::Idle),
        Op::Annotate(a) => Ok(Mutation::Annotate(a.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapreel_core::ThreadId;

    fn call(op: Op, time: u64, duration: u64) -> Call {
        Call::new(op, ThreadId(0), Micros(time), Micros(duration))
    }

    fn malloc(size: u32, ret: u32, time: u64) -> Call {
        let mut c = call(
            Op::Malloc {
                size,
                addr: None,
                color: None,
            },
            time,
            10,
        );
        c.ret = Some(ret);
        c
    }

    fn free(address: u32, time: u64) -> Call {
        call(
            Op::Free {
                address: Some(address),
                color: None,
            },
            time,
            10,
        )
    }

    #[test]
    fn fraction_is_linear_and_clamped() {
        let seg = Segment {
            call: 0,
            start: Micros(10),
            end: Micros(20),
            mutation: Mutation::Idle,
        };
        assert_eq!(seg.fraction(Micros(9)), None);
        assert_eq!(seg.fraction(Micros(10)), Some(0.0));
        assert_eq!(seg.fraction(Micros(15)), Some(0.5));
        assert_eq!(seg.fraction(Micros(25)), Some(1.0));
    }

    #[test]
    fn zero_length_segments_complete_on_reach() {
        let seg = Segment {
            call: 0,
            start: Micros(10),
            end: Micros(10),
            mutation: Mutation::Idle,
        };
        assert_eq!(seg.fraction(Micros(10)), Some(1.0));
    }

    #[test]
    fn frees_recover_size_from_malloc() {
        let trace = Trace::new(vec![malloc(6, 4, 0), free(4, 20)]).unwrap();
        let segments = build_segments(&trace).unwrap();
        assert_eq!(
            segments[1].mutation,
            Mutation::Clear {
                address: 4,
                size: 6
            }
        );
        assert_eq!(
            segments[0].mutation,
            Mutation::Fill {
                address: 4,
                size: 6,
                color: DEFAULT_FILL
            }
        );
    }

    #[test]
    fn unexecuted_traces_are_rejected() {
        let mut unrun = malloc(4, 0, 0);
        unrun.ret = None;
        let trace = Trace::new(vec![unrun]).unwrap();
        assert!(matches!(
            build_segments(&trace),
            Err(ReplayError::UnresolvedCall { index: 0 })
        ));
    }

    #[test]
    fn double_free_is_unmatched() {
        let trace = Trace::new(vec![malloc(2, 0, 0), free(0, 10), free(0, 20)]).unwrap();
        assert!(matches!(
            build_segments(&trace),
            Err(ReplayError::UnmatchedFree {
                index: 2,
                address: 0
            })
        ));
    }
}
