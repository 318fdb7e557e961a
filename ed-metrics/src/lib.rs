//! Statistics and result export for simulation runs
//!
//! This crate turns raw per-entity samples into run summaries (overall mean,
//! unbiased standard deviation, per-group count and mean) and persists them
//! as a semicolon separated results file or as JSON.
//!
//! Model code can also report through the standard `metrics` facade; a
//! [`RunRecorder`] installed around one run collects those updates, keeping
//! histograms in HdrHistogram form for percentile queries.

pub mod error;
pub mod export;
pub mod histogram;
pub mod recorder;
pub mod stats;

pub use error::MetricsError;
pub use export::csv::{read_results, CsvExporter, ResultRow};
pub use export::json::JsonExporter;
pub use export::{export_csv, export_json, SummaryExporter};
pub use histogram::{Percentiles, TimeHistogram};
pub use recorder::{with_run_metrics_recorder, MetricKey, RunMetrics, RunRecorder};
pub use stats::{mean, sample_std_dev, GroupSummary, GroupedSamples, RunSummary};
