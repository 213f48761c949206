//! Log messages tagged with the call that produced them.

use heapreel_core::{LogEntry, LogLevel, Micros, ThreadId};
use serde::{Deserialize, Serialize};

/// A guest log message plus where in the run it was emitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Index into the input call list; `None` for messages emitted while
    /// the allocator was loading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_index: Option<usize>,
    /// Start time of that call.
    pub time: Micros,
    /// Thread of that call.
    pub thread_id: ThreadId,
    /// The message.
    #[serde(flatten)]
    pub entry: LogEntry,
}

impl LogRecord {
    /// Severity of the message.
    pub fn level(&self) -> LogLevel {
        self.entry.level
    }

    /// Text of the message.
    pub fn message(&self) -> &str {
        &self.entry.message
    }
}
