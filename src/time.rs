//! Simulated time for the discrete-event kernel.
//!
//! Represents a logical instant with no dependency on `std::time`.
//! Time advances only when the executive dispatches events, never from
//! wall-clock observation.

use std::cmp::Ordering;

/// An instant on the simulated clock.
///
/// Always finite and non-negative, which is what makes the total order
/// below sound: no NaN ever reaches a comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SimTime(f64);

impl SimTime {
    /// The zero-point of simulation time.
    pub const ZERO: SimTime = SimTime(0.0);

    /// Create a `SimTime` from a raw value.
    ///
    /// # Panics
    /// Panics if `t` is negative, NaN or infinite. Use [`SimTime::try_new`]
    /// for values that come from outside the kernel.
    #[inline]
    pub fn new(t: f64) -> Self {
        match Self::try_new(t) {
            Some(time) => time,
            None => panic!("invalid simulation time: {}", t),
        }
    }

    /// Create a `SimTime`, returning `None` unless `t` is finite and `>= 0`.
    #[inline]
    pub fn try_new(t: f64) -> Option<Self> {
        if t.is_finite() && t >= 0.0 {
            // Normalise -0.0 so equal instants compare equal bit-for-bit.
            Some(SimTime(t + 0.0))
        } else {
            None
        }
    }

    /// Return the raw value.
    #[inline]
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Compute the instant `delay` after `self`.
    ///
    /// Returns `None` for a negative or non-finite delay, or if the sum
    /// overflows to infinity.
    #[inline]
    pub fn plus(self, delay: f64) -> Option<SimTime> {
        if !delay.is_finite() || delay < 0.0 {
            return None;
        }
        SimTime::try_new(self.0 + delay)
    }

    /// Returns `true` if `self` is strictly before `other`.
    #[inline]
    pub fn is_before(self, other: SimTime) -> bool {
        self.0 < other.0
    }

    /// Returns the elapsed time between two instants.
    /// Returns `None` if `other` is after `self`.
    #[inline]
    pub fn duration_since(self, other: SimTime) -> Option<f64> {
        if other.0 > self.0 {
            None
        } else {
            Some(self.0 - other.0)
        }
    }
}

impl Default for SimTime {
    fn default() -> Self {
        SimTime::ZERO
    }
}

impl Eq for SimTime {}

// Consistent with `Eq`: NaN is never stored and -0.0 is normalised.
impl std::hash::Hash for SimTime {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

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

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t={}", self.0)
    }
}
