//! Simulation time management

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Sub;

use crate::error::SimError;

/// A point on the simulated clock.
///
/// Time is measured in abstract model units (the emergency department model
/// uses minutes). The value is always finite and non-negative, which is what
/// allows `SimTime` to be totally ordered and used as a heap key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SimTime(f64);

impl SimTime {
    /// The start of every simulation.
    pub const fn zero() -> Self {
        SimTime(0.0)
    }

    /// Create a `SimTime` from a raw value.
    ///
    /// Fails for negative, infinite or NaN values.
    pub fn new(value: f64) -> Result<Self, SimError> {
        if !value.is_finite() || value < 0.0 {
            return Err(SimError::InvalidTime(value));
        }
        // Fold -0.0 into 0.0 so that equal instants compare equal.
        Ok(SimTime(if value == 0.0 { 0.0 } else { value }))
    }

    /// Get the raw time value
    pub const fn as_f64(&self) -> f64 {
        self.0
    }

    /// The instant `delay` units after `self`.
    ///
    /// Fails for negative, infinite or NaN delays.
    pub fn after(&self, delay: f64) -> Result<SimTime, SimError> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(SimError::InvalidDuration(delay));
        }
        SimTime::new(self.0 + delay)
    }

    /// Elapsed time since `earlier`, saturating at zero.
    pub fn duration_since(&self, earlier: SimTime) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Sub<SimTime> for SimTime {
    type Output = f64;

    fn sub(self, rhs: SimTime) -> Self::Output {
        self.duration_since(rhs)
    }
}

impl Default for SimTime {
    fn default() -> Self {
        SimTime::zero()
    }
}

impl TryFrom<f64> for SimTime {
    type Error = SimError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        SimTime::new(value)
    }
}

impl From<SimTime> for f64 {
    fn from(time: SimTime) -> Self {
        time.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T={:.3}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simtime_creation() {
        assert_eq!(SimTime::zero().as_f64(), 0.0);
        assert_eq!(SimTime::new(1.5).unwrap().as_f64(), 1.5);
        assert_eq!(SimTime::new(-0.0).unwrap(), SimTime::zero());
    }

    #[test]
    fn test_simtime_rejects_invalid_values() {
        assert_eq!(SimTime::new(-1.0), Err(SimError::InvalidTime(-1.0)));
        assert!(SimTime::new(f64::INFINITY).is_err());
        assert!(SimTime::new(f64::NAN).is_err());
    }

    #[test]
    fn test_simtime_arithmetic() {
        let t1 = SimTime::new(10.0).unwrap();
        let t2 = t1.after(2.5).unwrap();

        assert_eq!(t2.as_f64(), 12.5);
        assert_eq!(t2 - t1, 2.5);
        assert_eq!(t1 - t2, 0.0);
        assert_eq!(t1.after(-0.1), Err(SimError::InvalidDuration(-0.1)));
    }

    #[test]
    fn test_simtime_ordering() {
        let t1 = SimTime::new(10.0).unwrap();
        let t2 = SimTime::new(20.0).unwrap();

        assert!(t1 < t2);
        assert!(t2 > t1);
        assert_eq!(t1, t1);
        assert_eq!(t1.max(t2), t2);
    }

    #[test]
    fn test_display() {
        assert_eq!(SimTime::new(30.0).unwrap().to_string(), "T=30.000");
    }
}
