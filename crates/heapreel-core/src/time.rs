//! Integer timeline positions.
//!
//! All times inside heapreel are whole microseconds. Workload authors
//! write durations in milliseconds and the wire format carries
//! floating-point milliseconds, but the conversion happens exactly once
//! at each boundary so that ordering and equality are exact everywhere
//! else.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A point on (or a span of) the workload timeline, in microseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Micros(pub u64);

impl Micros {
    /// Time zero. Setup annotations emitted before the first call live here.
    pub const ZERO: Micros = Micros(0);

    /// Convert a millisecond value into microseconds.
    ///
    /// Returns `None` for NaN, infinite, negative, or out-of-range input.
    /// Sub-microsecond fractions are rounded to the nearest microsecond.
    pub fn from_millis_f64(ms: f64) -> Option<Self> {
        if !ms.is_finite() || ms < 0.0 {
            return None;
        }
        let us = (ms * 1000.0).round();
        if us > u64::MAX as f64 {
            return None;
        }
        Some(Micros(us as u64))
    }

    /// Whole milliseconds to microseconds.
    pub const fn from_millis(ms: u64) -> Self {
        Micros(ms * 1000)
    }

    /// This time expressed as floating-point milliseconds.
    pub fn as_millis_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Saturating addition; the timeline never wraps.
    pub fn saturating_add(self, rhs: Micros) -> Micros {
        Micros(self.0.saturating_add(rhs.0))
    }

    /// Saturating subtraction, clamped at zero.
    pub fn saturating_sub(self, rhs: Micros) -> Micros {
        Micros(self.0.saturating_sub(rhs.0))
    }
}

impl Add for Micros {
    type Output = Micros;

    fn add(self, rhs: Micros) -> Micros {
        self.saturating_add(rhs)
    }
}

impl AddAssign for Micros {
    fn add_assign(&mut self, rhs: Micros) {
        *self = self.saturating_add(rhs);
    }
}

impl Sub for Micros {
    type Output = Micros;

    fn sub(self, rhs: Micros) -> Micros {
        self.saturating_sub(rhs)
    }
}

impl fmt::Display for Micros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.as_millis_f64())
    }
}

impl Serialize for Micros {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_millis_f64())
    }
}

impl<'de> Deserialize<'de> for Micros {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        Micros::from_millis_f64(ms).ok_or_else(|| {
            de::Error::custom(format!(
                "time must be a finite, non-negative millisecond value, got {ms}"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_conversion_rounds_to_micros() {
        assert_eq!(Micros::from_millis_f64(1.0), Some(Micros(1000)));
        assert_eq!(Micros::from_millis_f64(0.0004), Some(Micros(0)));
        assert_eq!(Micros::from_millis_f64(0.0006), Some(Micros(1)));
        assert_eq!(Micros::from_millis_f64(2.5), Some(Micros(2500)));
    }

    #[test]
    fn rejects_non_finite_and_negative() {
        assert_eq!(Micros::from_millis_f64(f64::NAN), None);
        assert_eq!(Micros::from_millis_f64(f64::INFINITY), None);
        assert_eq!(Micros::from_millis_f64(-1.0), None);
    }

    #[test]
    fn arithmetic_saturates() {
        assert_eq!(Micros(5) - Micros(10), Micros::ZERO);
        assert_eq!(Micros(u64::MAX) + Micros(1), Micros(u64::MAX));
    }

    #[test]
    fn serde_uses_float_millis() {
        let json = serde_json::to_string(&Micros(1500)).unwrap();
        assert_eq!(json, "1.5");
        let back: Micros = serde_json::from_str("1.5").unwrap();
        assert_eq!(back, Micros(1500));
        assert!(serde_json::from_str::<Micros>("-3").is_err());
    }
}
