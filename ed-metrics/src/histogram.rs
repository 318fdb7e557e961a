//! High-resolution distribution of model times using HdrHistogram
//!
//! Values are model time units (minutes in the emergency department model)
//! stored at a resolution of a thousandth of a unit with three significant
//! figures. The histogram grows as needed, so no upper bound has to be
//! chosen up front.

use hdrhistogram::Histogram as HdrHistogram;
use serde::{Deserialize, Serialize};

use crate::error::MetricsError;

/// Recorded values per model time unit.
const RESOLUTION: f64 = 1000.0;

const SIGNIFICANT_FIGURES: u8 = 3;

/// Distribution of non-negative time samples.
#[derive(Debug, Clone)]
pub struct TimeHistogram {
    hist: HdrHistogram<u64>,
}

impl TimeHistogram {
    pub fn new() -> Result<Self, MetricsError> {
        let hist = HdrHistogram::new(SIGNIFICANT_FIGURES)
            .map_err(|e| MetricsError::Histogram(e.to_string()))?;
        Ok(Self { hist })
    }

    /// Record one sample. Negative and non-finite values are rejected.
    pub fn record(&mut self, value: f64) -> Result<(), MetricsError> {
        if !value.is_finite() || value < 0.0 {
            return Err(MetricsError::InvalidSample {
                value,
                reason: "must be finite and non-negative".to_string(),
            });
        }
        let scaled = (value * RESOLUTION).round() as u64;
        self.hist
            .record(scaled)
            .map_err(|e| MetricsError::InvalidSample {
                value,
                reason: e.to_string(),
            })
    }

    pub fn len(&self) -> u64 {
        self.hist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hist.len() == 0
    }

    /// Value below which a fraction `q` of the samples fall.
    pub fn quantile(&self, q: f64) -> f64 {
        self.hist.value_at_quantile(q) as f64 / RESOLUTION
    }

    /// Fails with [`MetricsError::EmptySample`] when nothing was recorded.
    pub fn percentiles(&self) -> Result<Percentiles, MetricsError> {
        if self.is_empty() {
            return Err(MetricsError::EmptySample(
                "percentiles of an empty histogram".to_string(),
            ));
        }
        Ok(Percentiles {
            count: self.len(),
            min: self.hist.min() as f64 / RESOLUTION,
            p50: self.quantile(0.5),
            p90: self.quantile(0.9),
            p95: self.quantile(0.95),
            p99: self.quantile(0.99),
            max: self.hist.max() as f64 / RESOLUTION,
        })
    }
}

/// Order statistics of a [`TimeHistogram`], accurate to three significant figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub count: u64,
    pub min: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
}

impl std::fmt::Display for Percentiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "count={}, min={:.2}, p50={:.2}, p90={:.2}, p95={:.2}, p99={:.2}, max={:.2}",
            self.count, self.min, self.p50, self.p90, self.p95, self.p99, self.max
        )
    }
}
