//! Hashing utilities for trace and state comparison.
//!
//! Uses FNV-1a for fast, deterministic hashing. These hashes are not
//! cryptographically secure; they exist for cheap equality checks when
//! verifying that two runs (or two seeks) produced the same result.

use heapreel_core::{AllocationKey, Annotation, Call, Color, Op, Trace};

use crate::state::ReplayState;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

/// Streaming FNV-1a state.
#[derive(Clone, Copy, Debug)]
struct Fnv(u64);

impl Fnv {
    fn new() -> Self {
        Self(FNV_OFFSET)
    }

    #[inline]
    fn byte(&mut self, b: u8) {
        self.0 = (self.0 ^ b as u64).wrapping_mul(FNV_PRIME);
    }

    fn bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.byte(b);
        }
    }

    fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.bytes(&v.to_le_bytes());
    }

    fn f64(&mut self, v: f64) {
        self.u64(v.to_bits());
    }

    /// Length-prefixed so adjacent strings cannot alias.
    fn str(&mut self, s: &str) {
        self.u64(s.len() as u64);
        self.bytes(s.as_bytes());
    }

    fn opt_u32(&mut self, v: Option<u32>) {
        match v {
            Some(v) => {
                self.byte(1);
                self.u32(v);
            }
            None => self.byte(0),
        }
    }

    fn opt_color(&mut self, c: Option<Color>) {
        self.opt_u32(c.map(Color::rgb));
    }
}

fn hash_annotation(h: &mut Fnv, a: &Annotation) {
    h.str(a.kind.as_str());
    h.u32(a.address);
    h.opt_u32(a.size);
    h.opt_u32(a.target);
    match &a.text {
        Some(t) => {
            h.byte(1);
            h.str(t);
        }
        None => h.byte(0),
    }
    h.opt_color(a.color);
    match a.alpha {
        Some(v) => {
            h.byte(1);
            h.f64(v);
        }
        None => h.byte(0),
    }
}

fn hash_call(h: &mut Fnv, call: &Call) {
    h.str(call.op.name());
    match &call.op {
        Op::Malloc { size, addr, color } => {
            h.u32(*size);
            h.opt_u32(*addr);
            h.opt_color(*color);
        }
        Op::Free { address, color } => {
            h.opt_u32(*address);
            h.opt_color(*color);
        }
        Op::Sleep => {}
        Op::Annotate(a) => hash_annotation(h, a),
    }
    match &call.id {
        Some(AllocationKey::Named(name)) => {
            h.byte(1);
            h.str(name);
        }
        Some(AllocationKey::Address(addr)) => {
            h.byte(2);
            h.u32(*addr);
        }
        None => h.byte(0),
    }
    h.opt_u32(call.ret);
    h.u32(call.thread_id.0);
    h.u64(call.time.0);
    h.u64(call.duration.0);
}

/// Hash a single call over every field.
pub fn call_hash(call: &Call) -> u64 {
    let mut h = Fnv::new();
    hash_call(&mut h, call);
    h.0
}

/// Hash a whole trace, in order.
///
/// Returns `FNV_OFFSET` folded with a zero length for the empty trace.
pub fn trace_hash(trace: &Trace) -> u64 {
    let mut h = Fnv::new();
    h.u64(trace.len() as u64);
    for call in trace {
        hash_call(&mut h, call);
    }
    h.0
}

/// Hash replay state: cell fills and every overlay mark.
pub fn state_hash(state: &ReplayState) -> u64 {
    let mut h = Fnv::new();
    for cell in state.cells() {
        h.opt_color(cell.fill);
        h.f64(cell.alpha);
    }
    let overlay = state.overlay();
    h.u64(overlay.ranges.len() as u64);
    for (addr, mark) in &overlay.ranges {
        h.u32(*addr);
        h.u32(mark.size);
        h.u32(mark.color.rgb());
        h.f64(mark.alpha);
    }
    h.u64(overlay.texts.len() as u64);
    for (addr, text) in &overlay.texts {
        h.u32(*addr);
        h.str(text);
    }
    h.u64(overlay.pointers.len() as u64);
    for (addr, target) in &overlay.pointers {
        h.u32(*addr);
        h.u32(*target);
    }
    h.u64(overlay.colors.len() as u64);
    for (addr, mark) in &overlay.colors {
        h.u32(*addr);
        h.u32(mark.size);
        h.u32(mark.color.rgb());
    }
    h.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapreel_core::{Micros, ThreadId};

    fn sleep(thread: u32, time: u64) -> Call {
        Call::new(Op::Sleep, ThreadId(thread), Micros(time), Micros(1))
    }

    #[test]
    fn same_calls_same_hash() {
        let a = Trace::new(vec![sleep(0, 1), sleep(1, 1)]).unwrap();
        let b = Trace::new(vec![sleep(0, 1), sleep(1, 1)]).unwrap();
        assert_eq!(trace_hash(&a), trace_hash(&b));
    }

    #[test]
    fn every_field_matters() {
        let base = sleep(0, 1);
        let mut other = base.clone();
        other.ret = Some(0);
        assert_ne!(call_hash(&base), call_hash(&other));
        assert_ne!(call_hash(&base), call_hash(&sleep(1, 1)));
        assert_ne!(call_hash(&base), call_hash(&sleep(0, 2)));
    }

    #[test]
    fn id_variants_do_not_alias() {
        let mut named = sleep(0, 1);
        named.id = Some(AllocationKey::Named("7".into()));
        let mut addr = sleep(0, 1);
        addr.id = Some(AllocationKey::Address(7));
        assert_ne!(call_hash(&named), call_hash(&addr));
    }

    #[test]
    fn empty_states_hash_equal() {
        assert_eq!(
            state_hash(&ReplayState::new(4)),
            state_hash(&ReplayState::new(4))
        );
        assert_ne!(
            state_hash(&ReplayState::new(4)),
            state_hash(&ReplayState::new(5))
        );
    }
}
