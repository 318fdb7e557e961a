//! Randomness facade for deterministic simulation.
//!
//! A run owns exactly one [`SimRng`], seeded once before the first event.
//! Processes draw from it through [`crate::SimContext`], and because only
//! one process runs at a time the order of draws follows the scheduler's
//! event order. Same seed, same event order, same draws.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::dists::{
    self, ArrivalPattern, Chance, ServiceTimeDistribution, WeightedChoice,
};
use crate::error::DistributionError;

/// The single random source of a simulation run.
///
/// Backed by ChaCha8, whose output stream is fixed for a given seed
/// regardless of platform, so stored seeds reproduce stored result rows.
#[derive(Debug, Clone)]
pub struct SimRng {
    seed: u64,
    draws: u64,
    rng: ChaCha8Rng,
}

impl SimRng {
    /// Create a generator from an explicit seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            draws: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Create a generator from a fresh OS-provided seed.
    ///
    /// The chosen seed is kept and can be read back with [`SimRng::seed`].
    pub fn from_entropy() -> Self {
        Self::seeded(rand::random())
    }

    /// The seed this generator was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of raw words drawn so far.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Sample `Triangular(min, mode, max)`.
    pub fn triangular(&mut self, min: f64, mode: f64, max: f64) -> Result<f64, DistributionError> {
        dists::triangular(self, min, mode, max)
    }

    /// Sample an exponential gap with the given rate.
    pub fn exponential(&mut self, rate: f64) -> Result<f64, DistributionError> {
        dists::exponential(self, rate)
    }

    /// Pick one outcome with probability proportional to its weight.
    pub fn weighted_choice<'a, T>(
        &mut self,
        outcomes: &'a [T],
        weights: &[f64],
    ) -> Result<&'a T, DistributionError> {
        dists::weighted_choice(self, outcomes, weights)
    }

    pub fn service_time(&mut self, dist: &dyn ServiceTimeDistribution) -> f64 {
        dist.sample(self)
    }

    pub fn interarrival(&mut self, pattern: &dyn ArrivalPattern) -> f64 {
        pattern.next_arrival_time(self)
    }

    pub fn choose<'a, T>(&mut self, choice: &'a WeightedChoice<T>) -> &'a T {
        choice.sample(self)
    }

    pub fn chance(&mut self, chance: &Chance) -> bool {
        chance.sample(self)
    }
}

impl RngCore for SimRng {
    fn next_u32(&mut self) -> u32 {
        self.draws += 1;
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws += 1;
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws += 1;
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws += 1;
        self.rng.try_fill_bytes(dest)
    }
}
