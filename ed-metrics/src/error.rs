//! Error types for statistics and result export

use thiserror::Error;

/// Errors related to summarizing and exporting results
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Summary statistics were requested over zero samples.
    #[error("Cannot summarize an empty sample: {0}")]
    EmptySample(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed results row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    /// A value a histogram cannot hold: negative, non-finite or too large.
    #[error("Cannot record {value} in histogram: {reason}")]
    InvalidSample { value: f64, reason: String },

    #[error("Failed to create histogram: {0}")]
    Histogram(String),
}
