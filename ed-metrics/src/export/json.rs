//! JSON export
//!
//! Writes run summaries, or any other serializable result, as one JSON
//! document per file.

use crate::error::MetricsError;
use crate::export::SummaryExporter;
use crate::stats::RunSummary;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// JSON exporter for run results
#[derive(Debug)]
pub struct JsonExporter {
    path: PathBuf,
    pretty: bool,
}

impl JsonExporter {
    /// Create a new JSON exporter
    ///
    /// # Arguments
    /// * `path` - Output file path, replaced on every write
    /// * `pretty` - Whether to pretty-print the JSON (adds whitespace for readability)
    pub fn new(path: &Path, pretty: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            pretty,
        }
    }

    /// Serialize `value` into the output file.
    pub fn write<T: Serialize>(&self, value: &T) -> Result<(), MetricsError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&self.path)?;
        file.write_all(json.as_bytes())?;

        debug!(path = %self.path.display(), bytes = json.len(), "Wrote JSON export");
        Ok(())
    }
}

impl SummaryExporter for JsonExporter {
    fn export(&self, summary: &RunSummary) -> Result<(), MetricsError> {
        self.write(summary)
    }
}
