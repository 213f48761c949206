//! Validated execution of a compiled workload against an allocator.
//!
//! [`run`] drives an [`AllocatorHost`] through a call list, checks every
//! block it hands out or takes back against a fresh [`Tracker`], and
//! enriches each call with what actually happened (returned address,
//! resolved id and free address, display color). Annotations and log
//! messages the allocator emits are drained after every call and woven
//! into the output. The first violation aborts the run.

use std::time::Instant;

use indexmap::IndexMap;
use serde::Serialize;

use heapreel_core::{
    check_range, AllocationKey, AllocatorHost, Call, Color, Micros, Op, ThreadId, Trace,
    ValidationError,
};

use crate::config::EngineConfig;
use crate::error::{ExecError, RunError};
use crate::log::LogRecord;
use crate::metrics::RunMetrics;
use crate::tracker::Tracker;

/// A live block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Allocation {
    /// First byte.
    pub address: u32,
    /// Length in bytes.
    pub size: u32,
    /// Display color.
    pub color: Color,
    /// Placed at an explicit address without consulting the allocator.
    pub pinned: bool,
}

/// The result of a successful run.
#[derive(Clone, Debug)]
pub struct Run {
    /// Every executed call, allocator annotations included, in order.
    pub trace: Trace,
    /// Log messages the allocator emitted.
    pub logs: Vec<LogRecord>,
    /// Highest byte ever allocated.
    pub peak_address: Option<u32>,
    /// Bytes still allocated at the end.
    pub occupied: usize,
    /// Blocks never freed, in allocation order.
    pub live_allocations: IndexMap<AllocationKey, Allocation>,
    /// Counters.
    pub metrics: RunMetrics,
}

/// Execute `calls` against `host`.
///
/// Annotations and log messages the host queued before the first call
/// (typically from a module start function) become time-zero calls on
/// thread 0. The input must already be in trace order.
///
/// # Errors
///
/// The first failing call aborts the run; the partial trace is dropped
/// and only the log trail is returned inside the [`RunError`].
///
/// # Examples
///
/// ```
/// use heapreel_core::{Call, Micros, Op, ThreadId};
/// use heapreel_engine::{run, EngineConfig};
/// use heapreel_test_utils::MockHost;
///
/// let malloc = Call::new(
///     Op::Malloc { size: 4, addr: None, color: None },
///     ThreadId(0),
///     Micros(1),
///     Micros(500_000),
/// );
/// let result = run(MockHost::new(16), vec![malloc], &EngineConfig::default()).unwrap();
/// assert_eq!(result.trace.calls()[0].ret, Some(0));
/// assert_eq!(result.occupied, 4);
/// ```
pub fn run<H: AllocatorHost>(
    host: H,
    calls: Vec<Call>,
    config: &EngineConfig,
) -> Result<Run, RunError> {
    let started = Instant::now();
    let mut exec = Executor::new(host, config, calls.len());
    tracing::info!(
        calls = calls.len(),
        capacity = exec.tracker.capacity(),
        "run started"
    );

    if let Err(kind) = config.validate().map_err(ExecError::from) {
        return Err(exec.fail(kind, None));
    }
    if let Err(kind) = exec.setup() {
        return Err(exec.fail(kind, None));
    }
    let calls = match Trace::new(calls) {
        Ok(trace) => trace.into_calls(),
        Err(e) => {
            let index = match e {
                ValidationError::UnsortedTrace { index } => Some(index),
                _ => None,
            };
            return Err(exec.fail(e.into(), index));
        }
    };
    for (index, call) in calls.into_iter().enumerate() {
        if let Err(kind) = exec.execute(index, call) {
            return Err(exec.fail(kind, Some(index)));
        }
    }
    exec.finish(started)
}

// ── Executor ───────────────────────────────────────────────────────

struct Executor<'c, H> {
    host: H,
    config: &'c EngineConfig,
    tracker: Tracker,
    live: IndexMap<AllocationKey, Allocation>,
    /// Mallocs so far that took their color from the palette.
    uncolored: usize,
    out: Vec<Call>,
    logs: Vec<LogRecord>,
}

impl<'c, H: AllocatorHost> Executor<'c, H> {
    fn new(host: H, config: &'c EngineConfig, calls: usize) -> Self {
        let tracker = Tracker::new(host.capacity());
        Self {
            host,
            config,
            tracker,
            live: IndexMap::new(),
            uncolored: 0,
            out: Vec::with_capacity(calls),
            logs: Vec::new(),
        }
    }

    fn setup(&mut self) -> Result<(), ExecError> {
        self.drain_logs(None, Micros::ZERO, ThreadId(0));
        self.drain_annotations(ThreadId(0), Micros::ZERO, Micros::ZERO)
    }

    fn execute(&mut self, index: usize, mut call: Call) -> Result<(), ExecError> {
        self.host.set_thread(call.thread_id);
        let applied = self.apply(&mut call);
        self.drain_logs(Some(index), call.time, call.thread_id);
        applied?;
        tracing::trace!(index, %call, "call executed");
        let (thread, time, duration) = (call.thread_id, call.time, call.duration);
        self.out.push(call);
        self.drain_annotations(thread, time, duration)
    }

    fn apply(&mut self, call: &mut Call) -> Result<(), ExecError> {
        let Call { op, id, ret, .. } = call;
        match op {
            Op::Malloc { size, addr, color } => {
                let (key, block) = self.malloc(*size, *addr, *color, id.take())?;
                *ret = Some(block.address);
                *id = Some(key);
                *color = Some(block.color);
            }
            Op::Free { address, color } => {
                let key = match (id.take(), *address) {
                    (Some(key), _) => key,
                    (None, Some(a)) => AllocationKey::Address(a),
                    (None, None) => {
                        return Err(ExecError::UnknownAllocationId {
                            id: "<unnamed>".to_string(),
                        })
                    }
                };
                let block = self.free(&key)?;
                *address = Some(block.address);
                *color = Some(color.unwrap_or(block.color));
                *id = Some(key);
            }
            Op::Sleep => {}
            Op::Annotate(annotation) => annotation.validate(self.tracker.capacity())?,
        }
        Ok(())
    }

    fn malloc(
        &mut self,
        size: u32,
        pinned: Option<u32>,
        color: Option<Color>,
        id: Option<AllocationKey>,
    ) -> Result<(AllocationKey, Allocation), ExecError> {
        if size == 0 {
            return Err(ValidationError::InvalidSize { size: 0 }.into());
        }
        let capacity = self.tracker.capacity();
        let address = match pinned {
            Some(address) => {
                check_range(i64::from(address), size, capacity)?;
                address
            }
            None => {
                let returned = self.host.malloc(size)?;
                let out_of_memory = ExecError::OutOfMemory {
                    size,
                    returned,
                    capacity,
                };
                if returned.saturating_add(i64::from(size)) > i64::from(capacity) {
                    return Err(out_of_memory);
                }
                u32::try_from(returned).map_err(|_| out_of_memory)?
            }
        };

        let key = id.unwrap_or(AllocationKey::Address(address));
        if self.live.contains_key(&key) {
            return Err(ValidationError::DuplicateAllocationId {
                id: key.to_string(),
            }
            .into());
        }
        self.tracker.set(address, size)?;

        let color = match color {
            Some(c) => c,
            None => {
                self.uncolored += 1;
                self.config.color(self.uncolored - 1)
            }
        };
        let block = Allocation {
            address,
            size,
            color,
            pinned: pinned.is_some(),
        };
        self.live.insert(key.clone(), block);
        Ok((key, block))
    }

    fn free(&mut self, key: &AllocationKey) -> Result<Allocation, ExecError> {
        let Some(&block) = self.live.get(key) else {
            return Err(ExecError::UnknownAllocationId {
                id: key.to_string(),
            });
        };
        self.tracker.unset(block.address, block.size)?;
        if !block.pinned {
            self.host.free(block.address)?;
        }
        self.live.shift_remove(key);
        Ok(block)
    }

    fn drain_annotations(
        &mut self,
        thread: ThreadId,
        time: Micros,
        duration: Micros,
    ) -> Result<(), ExecError> {
        let capacity = self.tracker.capacity();
        for annotation in self.host.drain_annotations() {
            annotation.validate(capacity)?;
            self.out
                .push(Call::new(Op::Annotate(annotation), thread, time, duration));
        }
        Ok(())
    }

    fn drain_logs(&mut self, call_index: Option<usize>, time: Micros, thread: ThreadId) {
        self.logs
            .extend(self.host.drain_logs().into_iter().map(|entry| LogRecord {
                call_index,
                time,
                thread_id: thread,
                entry,
            }));
    }

    fn fail(self, kind: ExecError, call_index: Option<usize>) -> RunError {
        tracing::warn!(?call_index, error = %kind, "run failed");
        RunError {
            kind,
            call_index,
            logs: self.logs,
        }
    }

    fn finish(self, started: Instant) -> Result<Run, RunError> {
        let trace = match Trace::new(self.out) {
            Ok(trace) => trace,
            Err(e) => {
                return Err(RunError {
                    kind: e.into(),
                    call_index: None,
                    logs: self.logs,
                })
            }
        };
        let metrics = RunMetrics {
            calls: trace.len(),
            mallocs: trace.count("malloc"),
            frees: trace.count("free"),
            annotations: trace.annotation_count(),
            log_entries: self.logs.len(),
            wall_us: u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
        };
        tracing::info!(
            calls = metrics.calls,
            mallocs = metrics.mallocs,
            frees = metrics.frees,
            annotations = metrics.annotations,
            peak = ?self.tracker.peak_address(),
            wall_us = metrics.wall_us,
            "run finished"
        );
        Ok(Run {
            trace,
            logs: self.logs,
            peak_address: self.tracker.peak_address(),
            occupied: self.tracker.occupied(),
            live_allocations: self.live,
            metrics,
        })
    }
}
