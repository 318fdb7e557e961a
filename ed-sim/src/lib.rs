//! Emergency department patient flow simulation.
//!
//! Patients arrive with exponentially distributed gaps, register at a single
//! desk, are sent to one of two casualty wards whose staff only comes on duty
//! at a fixed time, and then follow a type-dependent route through X-ray and
//! plaster rooms. The model records the time every patient spends in the
//! department and summarises it per patient type.
//!
//! # Example
//!
//! ```rust
//! use edsim::{run_simulation, EdConfig};
//!
//! let config = EdConfig {
//!     patients: 50,
//!     seed: Some(10),
//!     ..EdConfig::default()
//! };
//! let result = run_simulation(&config).unwrap();
//!
//! assert_eq!(result.summary.total, 50);
//! assert_eq!(result.seed, 10);
//! assert!(result.summary.overall_mean > 0.0);
//! ```

pub mod arrivals;
pub mod config;
pub mod department;
pub mod error;
pub mod patient;
pub mod stats;

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};

use edsim_core::Simulation;
use edsim_metrics::{with_run_metrics_recorder, Percentiles, RunMetrics};
use tracing::info;

pub use arrivals::generate_patients;
pub use config::{Capacities, EdConfig, ServiceTimes};
pub use department::{EmergencyDepartment, PATIENTS_COMPLETED, RESOURCE_WAIT, TIME_IN_SYSTEM};
pub use error::{ConfigError, EdError};
pub use patient::{CasualtyWard, Patient, PatientRecord, PatientType, Step};
pub use stats::{SimulationResult, StatisticsAggregator};

/// Run one simulation of `config.patients` patients to completion.
///
/// The configuration is validated before anything is scheduled. Without a
/// configured seed a fresh one is drawn; it is reported in the result either
/// way. Metrics emitted while the run executes are collected into the
/// result's percentile tables. A run that completes no patient fails with
/// [`edsim_metrics::MetricsError::EmptySample`].
pub fn run_simulation(config: &EdConfig) -> Result<SimulationResult, EdError> {
    config.validate()?;

    let mut sim = match config.seed {
        Some(seed) => Simulation::new(seed),
        None => Simulation::from_entropy(),
    };
    let ctx = sim.context();
    let ed = Rc::new(EmergencyDepartment::new(&ctx, config)?);

    info!(patients = config.patients, seed = sim.seed(), "Starting emergency department run");
    sim.spawn_generator(
        "arrivals",
        generate_patients(ctx, Rc::clone(&ed), config.patients),
    );
    let metrics = Arc::new(Mutex::new(RunMetrics::new()));
    let report = with_run_metrics_recorder(&metrics, || sim.run())?;

    let stats = ed.take_statistics();
    let summary = stats.summarize()?;
    info!(
        patients = summary.total,
        final_time = %report.final_time,
        events = report.events_processed,
        "Emergency department run finished"
    );

    let metrics = metrics.lock().unwrap_or_else(PoisonError::into_inner);
    let time_in_system = percentiles_by_label(&metrics, TIME_IN_SYSTEM, "type")?;
    let resource_wait = percentiles_by_label(&metrics, RESOURCE_WAIT, "resource")?;

    Ok(SimulationResult {
        patients: summary.total,
        seed: report.seed,
        final_time: report.final_time,
        events_processed: report.events_processed,
        stranded_processes: report.stranded_processes,
        summary,
        resources: ed.resource_stats(),
        time_in_system,
        resource_wait,
        records: stats.into_records(),
    })
}

fn percentiles_by_label(
    metrics: &RunMetrics,
    name: &str,
    label: &str,
) -> Result<BTreeMap<String, Percentiles>, EdError> {
    let mut table = BTreeMap::new();
    for (key, hist) in metrics.histograms_named(name) {
        if let Some((_, value)) = key.labels.iter().find(|(k, _)| k == label) {
            table.insert(value.clone(), hist.percentiles()?);
        }
    }
    Ok(table)
}
