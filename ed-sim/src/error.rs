//! Error types for the emergency department model

use std::path::PathBuf;

use edsim_core::SimError;
use edsim_metrics::MetricsError;
use thiserror::Error;

/// Problems found while loading or validating an [`crate::EdConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Field '{field}' must be {constraint}")]
    ConstraintViolation { field: String, constraint: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level error of a simulation run
#[derive(Debug, Error)]
pub enum EdError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Simulation failed: {0}")]
    Simulation(#[from] SimError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

impl From<edsim_core::DistributionError> for EdError {
    fn from(e: edsim_core::DistributionError) -> Self {
        EdError::Simulation(e.into())
    }
}
