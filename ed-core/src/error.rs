//! Error types for the simulation engine
//!
//! Every failure in this crate is either a configuration error (bad
//! distribution parameters, zero capacity) or an invariant violation
//! (releasing an idle resource, scheduling into the past). None of them are
//! retried: the first one returned by a process aborts the run.

use thiserror::Error;

/// Top-level error type for simulation operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Distribution error: {0}")]
    Distribution(#[from] DistributionError),

    #[error("Process '{task}' failed: {message}")]
    Process { task: String, message: String },

    #[error("Invalid delay {0}: expected a finite, non-negative duration")]
    InvalidDuration(f64),

    #[error("Invalid time {0}: expected a finite, non-negative timestamp")]
    InvalidTime(f64),
}

/// Errors related to event scheduling and dispatch
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    #[error("Event scheduling failed: T={requested} is before the current time T={current}")]
    NonCausal { requested: f64, current: f64 },
}

/// Errors raised by a [`crate::resource::Resource`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error("Resource '{resource}' must have a positive capacity")]
    ZeroCapacity { resource: String },

    #[error("Resource '{resource}' released with no current holder")]
    ReleaseWithoutHolder { resource: String },
}

/// Errors raised when building or sampling a distribution
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DistributionError {
    #[error("Triangular distribution requires min <= mode <= max, got ({min}, {mode}, {max})")]
    ModeOutOfRange { min: f64, mode: f64, max: f64 },

    #[error("Rate must be positive and finite, got {0}")]
    NonPositiveRate(f64),

    #[error("Probability must lie in [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Expected one weight per outcome: {outcomes} outcomes, {weights} weights")]
    LengthMismatch { outcomes: usize, weights: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_causal_display() {
        let e = SimError::from(EventError::NonCausal { requested: 3.0, current: 10.0 });
        let s = e.to_string();
        assert!(s.contains("T=3"));
        assert!(s.contains("T=10"));
    }

    #[test]
    fn test_release_display_names_resource() {
        let e = ResourceError::ReleaseWithoutHolder { resource: "x_ray".into() };
        assert_eq!(e.to_string(), "Resource 'x_ray' released with no current holder");
    }

    #[test]
    fn test_error_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(SimError::InvalidDuration(-1.0));
        assert!(!e.to_string().is_empty());
    }
}
