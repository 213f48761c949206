//! Raw allocator throughput.
//!
//! [`time`] replays the malloc/free calls of a workload against a host
//! with no occupancy tracking, no annotation draining and no trace
//! output, so the measurement is dominated by the allocator itself.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use heapreel_core::{AllocationKey, AllocatorHost, Call, HostError, Op};

/// Result of a timing pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Throughput {
    /// Allocator invocations performed.
    pub ops: usize,
    /// Wall time spent in the pass.
    pub elapsed: Duration,
}

impl Throughput {
    /// Invocations per second; zero for an empty or instantaneous pass.
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.ops as f64 / secs
        } else {
            0.0
        }
    }
}

/// Invoke `malloc`/`free` for every call in `calls`.
///
/// Pinned mallocs never reach the allocator and are skipped, as are
/// frees of blocks that were never handed out. Failed mallocs are
/// counted but not remembered.
///
/// # Errors
///
/// The first [`HostError`] the allocator raises.
pub fn time<H: AllocatorHost>(host: &mut H, calls: &[Call]) -> Result<Throughput, HostError> {
    let mut live: HashMap<AllocationKey, u32> = HashMap::new();
    let mut ops = 0;
    let started = Instant::now();
    for call in calls {
        match &call.op {
            Op::Malloc {
                size, addr: None, ..
            } => {
                host.set_thread(call.thread_id);
                let returned = host.malloc(*size)?;
                ops += 1;
                if let Ok(address) = u32::try_from(returned) {
                    let key = call.id.clone().unwrap_or(AllocationKey::Address(address));
                    live.insert(key, address);
                }
            }
            Op::Free { address, .. } => {
                let key = match (&call.id, address) {
                    (Some(key), _) => key.clone(),
                    (None, Some(a)) => AllocationKey::Address(*a),
                    (None, None) => continue,
                };
                if let Some(address) = live.remove(&key) {
                    host.set_thread(call.thread_id);
                    host.free(address)?;
                    ops += 1;
                }
            }
            _ => {}
        }
    }
    let elapsed = started.elapsed();
    let throughput = Throughput { ops, elapsed };
    tracing::info!(
        ops,
        elapsed_us = elapsed.as_micros() as u64,
        ops_per_sec = throughput.ops_per_sec(),
        "timing pass finished"
    );
    Ok(throughput)
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapreel_core::{Micros, ThreadId};
    use heapreel_test_utils::{MockCall, MockHost};

    fn call(op: Op, id: Option<AllocationKey>) -> Call {
        let c = Call::new(op, ThreadId(1), Micros(1), Micros(1));
        match id {
            Some(id) => c.with_id(id),
            None => c,
        }
    }

    #[test]
    fn counts_allocator_invocations() {
        let named = AllocationKey::Named("1-a".into());
        let calls = vec![
            call(
                Op::Malloc {
                    size: 4,
                    addr: None,
                    color: None,
                },
                Some(named.clone()),
            ),
            call(
                Op::Malloc {
                    size: 4,
                    addr: Some(8),
                    color: None,
                },
                None,
            ),
            call(Op::Sleep, None),
            call(
                Op::Free {
                    address: None,
                    color: None,
                },
                Some(named),
            ),
            call(
                Op::Free {
                    address: Some(12),
                    color: None,
                },
                Some(AllocationKey::Address(12)),
            ),
        ];
        let mut host = MockHost::new(16);
        let t = time(&mut host, &calls).unwrap();
        assert_eq!(t.ops, 2);
        assert_eq!(
            host.calls(),
            &[
                MockCall::Malloc {
                    thread: ThreadId(1),
                    size: 4
                },
                MockCall::Free {
                    thread: ThreadId(1),
                    address: 0
                },
            ]
        );
    }

    #[test]
    fn host_errors_stop_the_pass() {
        let mut host = MockHost::new(16).script(Err(HostError::Trap {
            reason: "boom".into(),
        }));
        let calls = vec![call(
            Op::Malloc {
                size: 1,
                addr: None,
                color: None,
            },
            None,
        )];
        assert!(matches!(time(&mut host, &calls), Err(HostError::Trap { .. })));
    }

    #[test]
    fn ops_per_sec_handles_zero_elapsed() {
        let t = Throughput {
            ops: 10,
            elapsed: Duration::ZERO,
        };
        assert_eq!(t.ops_per_sec(), 0.0);
        let t = Throughput {
            ops: 10,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(t.ops_per_sec(), 5.0);
    }
}
