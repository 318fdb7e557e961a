//! Distribution traits and implementations for arrival patterns and service times
//!
//! Distributions here own no random state. Every sample draws from the
//! simulation's single [`crate::randomness::SimRng`], so the whole sequence of
//! draws is fixed by the seed and the scheduler's event order.
//!
//! Parameters are validated once at construction; a bad triangle, a
//! non-positive rate or an all-zero weight vector is a configuration error
//! and never reaches sampling.

use rand::distributions::{Bernoulli, Distribution, WeightedIndex};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::DistributionError;

/// Trait for sampling service times from a distribution
pub trait ServiceTimeDistribution {
    /// Sample a service time, in model time units.
    fn sample(&self, rng: &mut dyn RngCore) -> f64;
}

/// Trait for generating arrival patterns
pub trait ArrivalPattern {
    /// Time until the next arrival, in model time units.
    fn next_arrival_time(&self, rng: &mut dyn RngCore) -> f64;
}

// =============================================================================
// Service Time Distribution Implementations
// =============================================================================

/// Raw parameters of a triangular distribution, as they appear in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriangularParams {
    pub min: f64,
    pub mode: f64,
    pub max: f64,
}

/// Triangular service time distribution on `[min, max]` peaking at `mode`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "TriangularParams", into = "TriangularParams")]
pub struct Triangular {
    params: TriangularParams,
    dist: rand_distr::Triangular<f64>,
}

impl Triangular {
    /// Create a triangular distribution.
    ///
    /// Fails unless all three values are finite and `min <= mode <= max`.
    pub fn new(min: f64, mode: f64, max: f64) -> Result<Self, DistributionError> {
        let out_of_range = DistributionError::ModeOutOfRange { min, mode, max };
        if !(min.is_finite() && mode.is_finite() && max.is_finite()) {
            return Err(out_of_range);
        }
        if !(min <= mode && mode <= max) {
            return Err(out_of_range);
        }
        let dist = rand_distr::Triangular::new(min, max, mode).map_err(|_| out_of_range)?;
        Ok(Self {
            params: TriangularParams { min, mode, max },
            dist,
        })
    }

    pub fn min(&self) -> f64 {
        self.params.min
    }

    pub fn mode(&self) -> f64 {
        self.params.mode
    }

    pub fn max(&self) -> f64 {
        self.params.max
    }

    /// Mean of the distribution, `(min + mode + max) / 3`.
    pub fn mean(&self) -> f64 {
        (self.params.min + self.params.mode + self.params.max) / 3.0
    }
}

impl PartialEq for Triangular {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params
    }
}

impl ServiceTimeDistribution for Triangular {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        self.dist.sample(rng)
    }
}

impl TryFrom<TriangularParams> for Triangular {
    type Error = DistributionError;

    fn try_from(p: TriangularParams) -> Result<Self, Self::Error> {
        Triangular::new(p.min, p.mode, p.max)
    }
}

impl From<Triangular> for TriangularParams {
    fn from(t: Triangular) -> Self {
        t.params
    }
}

/// Constant service time distribution
///
/// Always returns the same service time. Mostly useful in tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantServiceTime {
    duration: f64,
}

impl ConstantServiceTime {
    pub fn new(duration: f64) -> Self {
        Self { duration }
    }
}

impl ServiceTimeDistribution for ConstantServiceTime {
    fn sample(&self, _rng: &mut dyn RngCore) -> f64 {
        self.duration
    }
}

// =============================================================================
// Arrival Pattern Implementations
// =============================================================================

/// Poisson arrival pattern
///
/// Exponentially distributed inter-arrival times with the given rate
/// (arrivals per time unit).
#[derive(Debug, Clone, Copy)]
pub struct PoissonArrivals {
    rate: f64,
    exp_dist: rand_distr::Exp<f64>,
}

impl PoissonArrivals {
    /// Create a Poisson arrival pattern with `rate` arrivals per time unit.
    pub fn new(rate: f64) -> Result<Self, DistributionError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(DistributionError::NonPositiveRate(rate));
        }
        let exp_dist =
            rand_distr::Exp::new(rate).map_err(|_| DistributionError::NonPositiveRate(rate))?;
        Ok(Self { rate, exp_dist })
    }

    /// Create a Poisson arrival pattern from the mean gap between arrivals.
    pub fn from_mean_interarrival(mean: f64) -> Result<Self, DistributionError> {
        Self::new(1.0 / mean)
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Mean inter-arrival time (1/rate)
    pub fn mean_interarrival(&self) -> f64 {
        1.0 / self.rate
    }
}

impl PartialEq for PoissonArrivals {
    fn eq(&self, other: &Self) -> bool {
        self.rate == other.rate
    }
}

impl ArrivalPattern for PoissonArrivals {
    fn next_arrival_time(&self, rng: &mut dyn RngCore) -> f64 {
        self.exp_dist.sample(rng)
    }
}

// =============================================================================
// Categorical choices
// =============================================================================

/// Picks one of a fixed set of outcomes with probability proportional to its weight.
#[derive(Debug, Clone)]
pub struct WeightedChoice<T> {
    outcomes: Vec<T>,
    index: WeightedIndex<f64>,
}

impl<T> WeightedChoice<T> {
    /// Fails if the lengths differ, any weight is negative or non-finite, or
    /// all weights are zero.
    pub fn new(outcomes: Vec<T>, weights: &[f64]) -> Result<Self, DistributionError> {
        if outcomes.len() != weights.len() {
            return Err(DistributionError::LengthMismatch {
                outcomes: outcomes.len(),
                weights: weights.len(),
            });
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(DistributionError::InvalidWeights(format!(
                "non-finite weight in {weights:?}"
            )));
        }
        let index = WeightedIndex::new(weights)
            .map_err(|e| DistributionError::InvalidWeights(e.to_string()))?;
        Ok(Self { outcomes, index })
    }

    /// Draw one outcome.
    pub fn sample(&self, rng: &mut dyn RngCore) -> &T {
        &self.outcomes[self.index.sample(rng)]
    }

    pub fn outcomes(&self) -> &[T] {
        &self.outcomes
    }
}

/// Two-way split: `true` with probability `p`.
#[derive(Debug, Clone, Copy)]
pub struct Chance {
    p: f64,
    dist: Bernoulli,
}

impl Chance {
    pub fn new(p: f64) -> Result<Self, DistributionError> {
        let dist = Bernoulli::new(p).map_err(|_| DistributionError::InvalidProbability(p))?;
        Ok(Self { p, dist })
    }

    pub fn probability(&self) -> f64 {
        self.p
    }

    pub fn sample(&self, rng: &mut dyn RngCore) -> bool {
        self.dist.sample(rng)
    }
}

// =============================================================================
// One-shot sampling
// =============================================================================

/// Sample `Triangular(min, mode, max)` once.
pub fn triangular(
    rng: &mut dyn RngCore,
    min: f64,
    mode: f64,
    max: f64,
) -> Result<f64, DistributionError> {
    Ok(Triangular::new(min, mode, max)?.sample(rng))
}

/// Sample an exponential gap with the given rate once.
pub fn exponential(rng: &mut dyn RngCore, rate: f64) -> Result<f64, DistributionError> {
    Ok(PoissonArrivals::new(rate)?.next_arrival_time(rng))
}

/// Pick one of `outcomes` with probability proportional to `weights`.
pub fn weighted_choice<'a, T>(
    rng: &mut dyn RngCore,
    outcomes: &'a [T],
    weights: &[f64],
) -> Result<&'a T, DistributionError> {
    if outcomes.len() != weights.len() {
        return Err(DistributionError::LengthMismatch {
            outcomes: outcomes.len(),
            weights: weights.len(),
        });
    }
    let indices: Vec<usize> = (0..outcomes.len()).collect();
    let choice = WeightedChoice::new(indices, weights)?;
    Ok(&outcomes[*choice.sample(rng)])
}
