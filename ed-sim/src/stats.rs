//! Per-patient results and the run summary.

use std::collections::BTreeMap;

use edsim_core::{ResourceStats, SimTime};
use edsim_metrics::{GroupedSamples, MetricsError, Percentiles, RunSummary};
use serde::Serialize;
use tracing::{debug, info};

use crate::patient::{PatientRecord, PatientType};

/// Collects the record of every patient that left the department.
#[derive(Debug, Clone, Default)]
pub struct StatisticsAggregator {
    records: Vec<PatientRecord>,
}

impl StatisticsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: PatientRecord) {
        self.records.push(record);
    }

    /// Records in completion order.
    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<PatientRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Overall mean and deviation of the total times, plus count and mean
    /// per patient type. All four types are present, even with no patients.
    ///
    /// Fails with [`MetricsError::EmptySample`] when nobody was recorded.
    pub fn summarize(&self) -> Result<RunSummary, MetricsError> {
        let mut samples = GroupedSamples::new();
        for patient_type in PatientType::ALL {
            samples.declare(patient_type);
        }
        for record in &self.records {
            samples.record(record.patient_type, record.total_time());
        }
        samples.summarize(|patient_type| patient_type.to_string())
    }
}

/// Outcome of one simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub patients: usize,
    /// Seed the run actually used.
    pub seed: u64,
    pub final_time: SimTime,
    pub events_processed: u64,
    pub stranded_processes: usize,
    pub summary: RunSummary,
    pub resources: BTreeMap<String, ResourceStats>,
    /// Time in the department per patient type; types nobody belonged to are absent.
    pub time_in_system: BTreeMap<String, Percentiles>,
    /// Queueing time per resource.
    pub resource_wait: BTreeMap<String, Percentiles>,
    pub records: Vec<PatientRecord>,
}

impl SimulationResult {
    /// Lines of the console report, in print order.
    pub fn report_lines(&self) -> Vec<String> {
        let summary = &self.summary;
        let mut lines = vec![format!("Total patients processed: {}", summary.total)];
        for group in &summary.groups {
            if group.count == 0 {
                lines.push(format!("{}: 0 patients", group.label));
            } else {
                lines.push(format!(
                    "{}: {} patients, Avg. time = {:.2} minutes",
                    group.label, group.count, group.mean
                ));
            }
        }
        lines.push(format!(
            "Overall average treatment time: {:.2} minutes",
            summary.overall_mean
        ));
        lines.push(format!(
            "Standard deviation of treatment time: {:.2} minutes",
            summary.std_dev
        ));
        lines
    }

    /// Log the console report of the run.
    pub fn log_report(&self) {
        for line in self.report_lines() {
            info!("{line}");
        }

        for (label, percentiles) in &self.time_in_system {
            debug!("{label} time in system: {percentiles}");
        }
        for (resource, percentiles) in &self.resource_wait {
            debug!("Wait for {resource}: {percentiles}");
        }
    }
}
