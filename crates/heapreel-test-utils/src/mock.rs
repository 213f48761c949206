//! A native allocator host for engine tests.

use std::collections::{HashMap, VecDeque};

use heapreel_core::{
    AllocatorHost, Annotation, AnnotationKind, HostError, LogEntry, LogLevel, ThreadId,
};

/// One invocation observed by a [`MockHost`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockCall {
    Malloc { thread: ThreadId, size: u32 },
    Free { thread: ThreadId, address: u32 },
}

/// First-fit allocator implemented natively.
///
/// Scripted results queued with [`script`](MockHost::script) are
/// returned from `malloc` before the first-fit logic is consulted, which
/// makes it easy to hand the engine out-of-range or overlapping
/// addresses. Every call is recorded in [`calls`](MockHost::calls).
#[derive(Debug)]
pub struct MockHost {
    capacity: u32,
    thread: ThreadId,
    used: Vec<bool>,
    sizes: HashMap<u32, u32>,
    script: VecDeque<Result<i64, HostError>>,
    annotating: bool,
    has_free: bool,
    annotations: Vec<Annotation>,
    logs: Vec<LogEntry>,
    calls: Vec<MockCall>,
}

impl MockHost {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            thread: ThreadId::default(),
            used: vec![false; capacity as usize],
            sizes: HashMap::new(),
            script: VecDeque::new(),
            annotating: false,
            has_free: true,
            annotations: Vec::new(),
            logs: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Queue a result for an upcoming `malloc`.
    pub fn script(mut self, result: Result<i64, HostError>) -> Self {
        self.script.push_back(result);
        self
    }

    /// Highlight each allocated block and log each call.
    pub fn annotating(mut self) -> Self {
        self.annotating = true;
        self
    }

    /// Behave like a module that does not export `free`.
    pub fn without_free(mut self) -> Self {
        self.has_free = false;
        self
    }

    /// Queue an annotation as if emitted while loading.
    pub fn with_setup_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Queue a log entry as if emitted while loading.
    pub fn with_setup_log(mut self, entry: LogEntry) -> Self {
        self.logs.push(entry);
        self
    }

    /// Every `malloc`/`free` invocation so far.
    pub fn calls(&self) -> &[MockCall] {
        &self.calls
    }

    fn first_fit(&self, size: u32) -> Option<u32> {
        let size = size as usize;
        if size == 0 || size > self.used.len() {
            return None;
        }
        (0..=self.used.len() - size)
            .find(|&start| self.used[start..start + size].iter().all(|u| !u))
            .map(|start| start as u32)
    }

    fn mark(&mut self, address: u32, size: u32, value: bool) {
        let start = address as usize;
        let end = (start + size as usize).min(self.used.len());
        if start < end {
            self.used[start..end].fill(value);
        }
    }
}

impl AllocatorHost for MockHost {
    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn set_thread(&mut self, thread: ThreadId) {
        self.thread = thread;
    }

    fn malloc(&mut self, size: u32) -> Result<i64, HostError> {
        self.calls.push(MockCall::Malloc {
            thread: self.thread,
            size,
        });
        if let Some(result) = self.script.pop_front() {
            return result;
        }
        let Some(address) = self.first_fit(size) else {
            return Ok(-1);
        };
        self.mark(address, size, true);
        self.sizes.insert(address, size);
        if self.annotating {
            self.annotations
                .push(Annotation::range(address, size, None, None));
            self.logs.push(LogEntry::new(
                LogLevel::Info,
                format!("malloc({size}) = {address}"),
            ));
        }
        Ok(i64::from(address))
    }

    fn free(&mut self, address: u32) -> Result<(), HostError> {
        if !self.has_free {
            return Err(HostError::NotImplemented { export: "free" });
        }
        self.calls.push(MockCall::Free {
            thread: self.thread,
            address,
        });
        if let Some(size) = self.sizes.remove(&address) {
            self.mark(address, size, false);
        }
        if self.annotating {
            self.annotations
                .push(Annotation::remove(AnnotationKind::RemoveRange, address));
            self.logs
                .push(LogEntry::new(LogLevel::Warn, format!("free({address})")));
        }
        Ok(())
    }

    fn drain_annotations(&mut self) -> Vec<Annotation> {
        std::mem::take(&mut self.annotations)
    }

    fn drain_logs(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.logs)
    }
}
