//! Export functionality for run summaries
//!
//! Two formats are supported: the semicolon separated results file that
//! accumulates one row per run, and a JSON dump of any serializable result.

pub mod csv;
pub mod json;

use crate::error::MetricsError;
use crate::stats::RunSummary;
use serde::Serialize;
use std::path::Path;

/// Trait for exporting run summaries to different formats
pub trait SummaryExporter {
    /// Export one summary to the configured destination
    fn export(&self, summary: &RunSummary) -> Result<(), MetricsError>;
}

/// Append a summary row to a results file, creating it (and its parent
/// directory) with a header row if it does not exist yet.
///
/// # Example
/// ```no_run
/// use edsim_metrics::export::export_csv;
/// # fn demo(summary: &edsim_metrics::RunSummary) {
/// export_csv(summary, "results/Task1.csv").unwrap();
/// # }
/// ```
pub fn export_csv(summary: &RunSummary, path: impl AsRef<Path>) -> Result<(), MetricsError> {
    csv::CsvExporter::new(path.as_ref()).export(summary)
}

/// Write any serializable value to a JSON file
///
/// # Example
/// ```no_run
/// use edsim_metrics::export::export_json;
/// # fn demo(summary: &edsim_metrics::RunSummary) {
/// export_json(summary, "results/summary.json", true).unwrap();
/// # }
/// ```
pub fn export_json<T: Serialize>(
    value: &T,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), MetricsError> {
    json::JsonExporter::new(path.as_ref(), pretty).write(value)
}
