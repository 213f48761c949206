//! The ordered call sequence of one run.

use serde::{Deserialize, Serialize};

use crate::call::{Call, Op};
use crate::error::ValidationError;
use crate::time::Micros;

/// A complete, ordered sequence of calls.
///
/// The invariant is that calls are sorted by `(time, thread)` ascending;
/// calls with equal keys keep the order in which they were emitted.
/// Every constructor upholds it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Trace {
    calls: Vec<Call>,
}

impl Trace {
    /// Wrap an already-sorted call list.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnsortedTrace`] naming the first call
    /// that sorts before its predecessor.
    pub fn new(calls: Vec<Call>) -> Result<Self, ValidationError> {
        if let Some(index) = first_unsorted(&calls) {
            return Err(ValidationError::UnsortedTrace { index });
        }
        Ok(Self { calls })
    }

    /// Sort `calls` (stably) into trace order.
    pub fn from_unsorted(mut calls: Vec<Call>) -> Self {
        calls.sort_by_key(Call::sort_key);
        Self { calls }
    }

    /// The calls, in order.
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Number of calls.
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    /// `true` if there are no calls.
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Latest end time over all calls.
    pub fn total_duration(&self) -> Micros {
        self.calls
            .iter()
            .map(Call::end)
            .max()
            .unwrap_or(Micros::ZERO)
    }

    /// Number of calls that invoke `function` (`"malloc"`, `"free"`, ...).
    pub fn count(&self, function: &str) -> usize {
        self.calls
            .iter()
            .filter(|c| c.op.name() == function)
            .count()
    }

    /// Number of annotate calls.
    pub fn annotation_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c.op, Op::Annotate(_)))
            .count()
    }

    /// Take the calls out.
    pub fn into_calls(self) -> Vec<Call> {
        self.calls
    }
}

impl<'de> Deserialize<'de> for Trace {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let calls = Vec::<Call>::deserialize(deserializer)?;
        Trace::new(calls).map_err(serde::de::Error::custom)
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a Call;
    type IntoIter = std::slice::Iter<'a, Call>;

    fn into_iter(self) -> Self::IntoIter {
        self.calls.iter()
    }
}

fn first_unsorted(calls: &[Call]) -> Option<usize> {
    calls
        .windows(2)
        .position(|w| w[1].sort_key() < w[0].sort_key())
        .map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ThreadId;

    fn sleep(thread: u32, time: u64) -> Call {
        Call::new(Op::Sleep, ThreadId(thread), Micros(time), Micros(10))
    }

    #[test]
    fn new_rejects_unsorted() {
        let err = Trace::new(vec![sleep(0, 5), sleep(0, 3)]).unwrap_err();
        assert_eq!(err, ValidationError::UnsortedTrace { index: 1 });
    }

    #[test]
    fn thread_breaks_time_ties() {
        let err = Trace::new(vec![sleep(1, 5), sleep(0, 5)]).unwrap_err();
        assert_eq!(err, ValidationError::UnsortedTrace { index: 1 });
        assert!(Trace::new(vec![sleep(0, 5), sleep(1, 5)]).is_ok());
    }

    #[test]
    fn from_unsorted_is_stable() {
        let mut a = sleep(0, 5);
        a.ret = Some(1);
        let mut b = sleep(0, 5);
        b.ret = Some(2);
        let trace = Trace::from_unsorted(vec![sleep(1, 0), a, b, sleep(0, 0)]);
        let rets: Vec<_> = trace.calls().iter().map(|c| c.ret).collect();
        assert_eq!(rets, vec![None, None, Some(1), Some(2)]);
        assert_eq!(trace.calls()[0].thread_id, ThreadId(0));
    }

    #[test]
    fn total_duration_is_latest_end() {
        let trace = Trace::from_unsorted(vec![sleep(0, 0), sleep(1, 100)]);
        assert_eq!(trace.total_duration(), Micros(110));
        assert_eq!(Trace::default().total_duration(), Micros::ZERO);
    }

    #[test]
    fn deserialize_validates_order() {
        let json = serde_json::to_string(&vec![sleep(0, 5), sleep(0, 1)]).unwrap();
        assert!(serde_json::from_str::<Trace>(&json).is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_calls() -> impl Strategy<Value = Vec<Call>> {
            prop::collection::vec((0u32..4, 0u64..20), 0..40).prop_map(|keys| {
                keys.into_iter()
                    .enumerate()
                    .map(|(i, (thread, time))| {
                        let mut call = sleep(thread, time);
                        call.ret = Some(i as u32);
                        call
                    })
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn from_unsorted_satisfies_new(calls in arb_calls()) {
                let sorted = Trace::from_unsorted(calls.clone());
                prop_assert_eq!(sorted.len(), calls.len());
                prop_assert_eq!(Trace::new(sorted.clone().into_calls()).unwrap(), sorted);
            }

            #[test]
            fn equal_keys_keep_emission_order(calls in arb_calls()) {
                let sorted = Trace::from_unsorted(calls);
                for w in sorted.calls().windows(2) {
                    if w[0].sort_key() == w[1].sort_key() {
                        prop_assert!(w[0].ret < w[1].ret);
                    }
                }
            }
        }
    }
}
