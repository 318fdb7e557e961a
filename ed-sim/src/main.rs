//! Command line driver: repeated runs appended to a results file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use edsim::{run_simulation, EdConfig, EdError, SimulationResult};
use edsim_core::init_simulation_logging_with_level;
use edsim_metrics::{export_csv, export_json, MetricsError};
use tracing::{error, info};

/// Emergency department patient flow simulation
#[derive(Parser, Debug)]
#[command(name = "edsim", version, about = "Simulate patient flow through an emergency department.")]
struct Cli {
    /// Patients per run (overrides the config file)
    #[arg(short, long)]
    patients: Option<usize>,

    /// Seed of the first run; run i uses seed + i
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of independent runs
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u64).range(1..))]
    runs: u64,

    /// Results file, one row appended per run
    #[arg(short, long, default_value = "results/Task1.csv")]
    output: PathBuf,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the last run's full result as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_simulation_logging_with_level(&cli.log_level);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), EdError> {
    let mut config = match &cli.config {
        Some(path) => EdConfig::load(path)?,
        None => EdConfig::default(),
    };
    if let Some(patients) = cli.patients {
        config.patients = patients;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    config.validate()?;
    if config.patients == 0 {
        return Err(MetricsError::EmptySample("no patients to simulate".to_string()).into());
    }

    let base_seed = config.seed;
    let mut last: Option<SimulationResult> = None;
    for run in 0..cli.runs {
        config.seed = base_seed.map(|seed| seed.wrapping_add(run));
        info!(run = run + 1, of = cli.runs, "Starting run");

        let result = run_simulation(&config)?;
        result.log_report();
        export_csv(&result.summary, &cli.output)?;
        last = Some(result);
    }
    info!(path = %cli.output.display(), runs = cli.runs, "Results written");

    if let (Some(path), Some(result)) = (&cli.json, &last) {
        write_json(result, path)?;
    }
    Ok(())
}

fn write_json(result: &SimulationResult, path: &Path) -> Result<(), EdError> {
    export_json(result, path, true)?;
    info!(path = %path.display(), "Last run written as JSON");
    Ok(())
}
