/// Simulated time for the coupling scheduler.
///
/// A `SimTime` is a point on the scheduler's global timeline, expressed in
/// the scheduler's time units. Time advances only when the scheduler
/// executes events, never from wall-clock observation.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A timestamp on the global simulated timeline.
///
/// Wraps an `f64` but is totally ordered (via [`f64::total_cmp`]) so it can
/// key the scheduler's heap. Constructors never produce NaN.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimTime(f64);

impl SimTime {
    /// The zero-point of simulated time.
    pub const ZERO: SimTime = SimTime(0.0);

    /// Create a new `SimTime`.
    ///
    /// # Panics
    /// Panics if `value` is NaN.
    #[inline]
    pub fn new(value: f64) -> Self {
        assert!(!value.is_nan(), "SimTime cannot be NaN");
        SimTime(value)
    }

    /// Return the raw value.
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// The time `delta` after `self`.
    #[inline]
    pub fn plus(self, delta: f64) -> SimTime {
        SimTime::new(self.0 + delta)
    }

    /// Returns `true` if `self` is strictly before `other`.
    #[inline]
    pub fn is_before(self, other: SimTime) -> bool {
        self < other
    }

    /// Elapsed time from `earlier` to `self`.
    /// Returns `None` if `earlier` is after `self`.
    #[inline]
    pub fn duration_since(self, earlier: SimTime) -> Option<f64> {
        if earlier > self {
            None
        } else {
            Some(self.0 - earlier.0)
        }
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<f64> for SimTime {
    fn from(value: f64) -> Self {
        SimTime::new(value)
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T={}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert_eq!(SimTime::ZERO.value(), 0.0);
    }

    #[test]
    fn test_ordering() {
        let t1 = SimTime::new(1.0);
        let t2 = SimTime::new(1.2);
        assert!(t1 < t2);
        assert!(t1.is_before(t2));
        assert!(!t2.is_before(t1));
    }

    #[test]
    fn test_plus() {
        assert_eq!(SimTime::new(1.5).plus(0.25), SimTime::new(1.75));
    }

    #[test]
    fn test_duration_since() {
        let t1 = SimTime::new(1.0);
        let t2 = SimTime::new(3.0);
        assert_eq!(t2.duration_since(t1), Some(2.0));
        assert_eq!(t1.duration_since(t2), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", SimTime::new(2.5)), "T=2.5");
    }

    #[test]
    #[should_panic(expected = "NaN")]
    fn test_nan_rejected() {
        let _ = SimTime::new(f64::NAN);
    }
}
