//! Structured logging for discrete event simulation debugging
//!
//! Everything in the engine logs through `tracing`; this module wires up a
//! `tracing-subscriber` formatter and offers a few helpers for the messages
//! every run emits.
//!
//! # Controlling output
//!
//! ## 1. `init_detailed_simulation_logging()` for debugging
//! ```rust
//! use edsim_core::init_detailed_simulation_logging;
//! init_detailed_simulation_logging();
//! ```
//! Shows every level, pretty-printed.
//!
//! ## 2. `init_simulation_logging_with_level()` for a fixed level
//! ```rust
//! use edsim_core::init_simulation_logging_with_level;
//! init_simulation_logging_with_level("debug");
//! ```
//!
//! ## 3. Environment variables
//! ```bash
//! RUST_LOG=debug edsim
//! RUST_LOG=edsim_core::resource=trace,edsim=info edsim
//! ```
//! `RUST_LOG` always wins over the level passed in code.
//!
//! ## Level guidelines
//! - **TRACE**: every event pop, process poll, resource grant and release
//! - **DEBUG**: process spawn and completion, run state transitions
//! - **INFO**: run start and finish, summary lines
//! - **WARN**: a run ended with processes still suspended
//! - **ERROR**: a run aborted by a fatal error
//!
//! Every initializer uses `try_init`, so calling one twice (from several
//! tests, or once per run) is harmless.

use crate::{SimTime, TaskId};
use tracing::{error, info, warn, Span};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for the simulation with sensible defaults (INFO).
pub fn init_simulation_logging() {
    init_simulation_logging_with_level("info")
}

/// Initialize logging with a specific level
///
/// # Arguments
/// * `level` - Log level: "trace", "debug", "info", "warn", or "error"
pub fn init_simulation_logging_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(false)
                .with_line_number(false),
        )
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        info!("Simulation logging initialized at level: {}", level);
    }
}

/// Initialize logging with custom configuration for advanced debugging
pub fn init_detailed_simulation_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trace,edsim_core=trace,edsim_metrics=debug,edsim=debug"));

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true)
                .pretty(),
        )
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        info!("Detailed simulation logging initialized");
    }
}

/// Create a span for tracking one simulation run
pub fn simulation_span(name: &str, seed: u64) -> Span {
    tracing::info_span!("simulation", name = name, seed = seed)
}

/// Create a span for tracking one polled process
pub fn process_span(name: &str, task: TaskId) -> Span {
    tracing::trace_span!("process", name = name, id = %task)
}

/// Logging utilities for common simulation events
pub mod events {
    use super::*;

    /// Log simulation start
    pub fn simulation_started(seed: u64, end_time: Option<SimTime>) {
        match end_time {
            Some(end) => info!(seed, end_time = %end, "Simulation started"),
            None => info!(seed, "Simulation started (unbounded)"),
        }
    }

    /// Log simulation completion
    pub fn simulation_completed(final_time: SimTime, events_processed: u64) {
        info!(final_time = %final_time, events_processed, "Simulation completed");
    }
}

/// Logging utilities for error conditions and warnings
pub mod diagnostics {
    use super::*;

    /// Log processes left suspended when the event queue ran dry.
    pub fn stranded_processes(names: &[String], final_time: SimTime) {
        warn!(
            count = names.len(),
            processes = ?names,
            final_time = %final_time,
            "Simulation terminated with suspended processes"
        );
    }

    /// Log a process error that aborted the run.
    pub fn run_aborted(process: &str, error: &dyn std::error::Error, time: SimTime) {
        error!(process, error = %error, time = %time, "Simulation aborted");
    }
}
