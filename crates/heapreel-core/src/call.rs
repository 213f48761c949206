//! Calls: the unit of work in a trace.
//!
//! The workload compiler produces [`Call`]s with their thread, time, and
//! duration assigned. The execution engine fills in the results (return
//! address, resolved allocation key, color) and inserts synthetic
//! annotation calls. After that the calls are frozen.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use crate::annotation::Annotation;
use crate::id::{AllocationKey, Color, ThreadId};
use crate::time::Micros;

/// The function a call invokes, with its arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "lowercase")]
pub enum Op {
    /// Allocate `size` bytes.
    Malloc {
        /// Requested size in bytes.
        size: u32,
        /// Pinned address: the allocator is bypassed and this address is used.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        addr: Option<u32>,
        /// Display color of the allocation.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<Color>,
    },
    /// Release an allocation.
    Free {
        /// Address being freed; filled in by the engine when the workload
        /// named the allocation by id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        address: Option<u32>,
        /// Color of the allocation being released.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<Color>,
    },
    /// Advance the thread clock without touching memory.
    Sleep,
    /// Apply a visual annotation.
    Annotate(Annotation),
}

impl Op {
    /// The wire name of this function.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Malloc { .. } => "malloc",
            Self::Free { .. } => "free",
            Self::Sleep => "sleep",
            Self::Annotate(_) => "annotate",
        }
    }
}

/// One resolved operation on the timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    /// Function and arguments.
    #[serde(flatten)]
    pub op: Op,
    /// Allocation key for malloc/free.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AllocationKey>,
    /// Address returned by malloc.
    #[serde(rename = "return", default, skip_serializing_if = "Option::is_none")]
    pub ret: Option<u32>,
    /// Logical thread that issued the call.
    pub thread_id: ThreadId,
    /// Start time.
    pub time: Micros,
    /// Animation length.
    pub duration: Micros,
}

impl Call {
    /// A call with no results filled in.
    pub fn new(op: Op, thread_id: ThreadId, time: Micros, duration: Micros) -> Self {
        Self {
            op,
            id: None,
            ret: None,
            thread_id,
            time,
            duration,
        }
    }

    /// Attach an allocation key.
    pub fn with_id(mut self, id: AllocationKey) -> Self {
        self.id = Some(id);
        self
    }

    /// End of this call's animation span.
    pub fn end(&self) -> Micros {
        self.time + self.duration
    }

    /// The positional arguments of the call, as a flat list.
    ///
    /// `malloc(size)`, `free(address)`, `sleep()`, `annotate(address)`.
    /// A free whose address has not yet been resolved has no arguments.
    pub fn args(&self) -> SmallVec<[u32; 2]> {
        match &self.op {
            Op::Malloc { size, .. } => smallvec![*size],
            Op::Free {
                address: Some(a), ..
            } => smallvec![*a],
            Op::Free { address: None, .. } | Op::Sleep => SmallVec::new(),
            Op::Annotate(a) => smallvec![a.address],
        }
    }

    /// Display color for malloc/free calls.
    pub fn color(&self) -> Option<Color> {
        match &self.op {
            Op::Malloc { color, .. } | Op::Free { color, .. } => *color,
            Op::Sleep | Op::Annotate(_) => None,
        }
    }

    /// `(time, thread)` ordering key of the trace invariant.
    pub fn sort_key(&self) -> (Micros, ThreadId) {
        (self.time, self.thread_id)
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[t{} @{}] {}(", self.thread_id, self.time, self.op.name())?;
        for (i, arg) in self.args().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")?;
        if let Some(ret) = self.ret {
            write!(f, " = {ret}")?;
        }
        Ok(())
    }
}

/// Severity of an allocator log message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Informational.
    Info,
    /// Suspicious but not fatal.
    Warn,
    /// Something went wrong.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// A message logged by allocator code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Severity.
    pub level: LogLevel,
    /// Message text.
    pub message: String,
}

impl LogEntry {
    /// Build a log entry.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationKind;

    #[test]
    fn malloc_serializes_flat() {
        let mut call = Call::new(
            Op::Malloc {
                size: 8,
                addr: None,
                color: Some(Color::from_rgb(0xff0000)),
            },
            ThreadId(1),
            Micros(1500),
            Micros(500),
        );
        call.ret = Some(16);
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["function"], "malloc");
        assert_eq!(json["size"], 8);
        assert_eq!(json["return"], 16);
        assert_eq!(json["threadId"], 1);
        assert_eq!(json["time"], 1.5);
        assert_eq!(json["color"], 0xff0000);
        assert!(json.get("addr").is_none());
    }

    #[test]
    fn annotate_round_trips() {
        let call = Call::new(
            Op::Annotate(Annotation::range(4, 8, Some(Color::from_rgb(0x00ff00)), Some(0.5))),
            ThreadId(0),
            Micros::ZERO,
            Micros::ZERO,
        );
        let json = serde_json::to_string(&call).unwrap();
        let back: Call = serde_json::from_str(&json).unwrap();
        assert_eq!(back, call);
        match back.op {
            Op::Annotate(a) => assert_eq!(a.kind, AnnotationKind::Range),
            other => panic!("expected annotate, got {other:?}"),
        }
    }

    #[test]
    fn args_follow_function() {
        let free = Call::new(
            Op::Free {
                address: Some(24),
                color: None,
            },
            ThreadId(0),
            Micros(1),
            Micros(1),
        );
        assert_eq!(free.args().as_slice(), &[24]);
        let sleep = Call::new(Op::Sleep, ThreadId(0), Micros(1), Micros(1));
        assert!(sleep.args().is_empty());
    }

    #[test]
    fn display_is_readable() {
        let mut call = Call::new(
            Op::Malloc {
                size: 4,
                addr: None,
                color: None,
            },
            ThreadId(2),
            Micros(1000),
            Micros(0),
        );
        call.ret = Some(8);
        assert_eq!(call.to_string(), "[t2 @1ms] malloc(4) = 8");
    }
}
