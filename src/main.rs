use anyhow::Result;
use clap::Parser;
use log::{debug, error, info};
use std::path::PathBuf;
use std::time::Instant;

use dla_common::SimulationConfig;
use dla_engine::{CsvExporter, Experiment, LogProgress};

/// Command-line arguments for the deposition engine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Base seed for the sweep (overrides [rng] seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Run the sticking probabilities concurrently
    #[arg(long)]
    parallel: bool,

    /// Output directory (overrides [output] base_directory)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::init();
    let args = Args::parse();

    info!("Starting deposition engine...");

    // --- Load Configuration ---
    let mut config = SimulationConfig::load(&args.config)?;
    if args.seed.is_some() {
        config.rng.seed = args.seed;
    }
    if args.parallel {
        config.execution.parallel = true;
    }
    if let Some(dir) = &args.output {
        config.output.base_directory = dir.display().to_string();
    }
    debug!("Configuration: {:#?}", config);

    let mut exporter = CsvExporter::new(&config.output);
    let experiment = Experiment::new(config);

    let start_time = Instant::now();
    let reports = experiment.run(&mut exporter, &LogProgress);
    let total_duration = start_time.elapsed();

    // --- Summary ---
    let mut failures = 0;
    for report in &reports {
        match &report.result {
            Ok(metadata) => {
                info!(
                    "Run complete (p = {:.3}): launched {} | deposited {} | final step {}",
                    metadata.sticking_probability, metadata.launched, metadata.deposited, metadata.final_step
                );
                if let Some(e) = &report.export_error {
                    error!("  ...but its output could not be saved: {:#}", e);
                    failures += 1;
                }
            }
            Err(e) => {
                error!("Run failed (p = {:.3}, seed {}): {:#}", report.sticking_probability, report.seed, e);
                failures += 1;
            }
        }
    }
    info!(
        "Sweep finished in {:.3} seconds ({} files written).",
        total_duration.as_secs_f64(),
        exporter.written_files().len()
    );

    if failures > 0 {
        anyhow::bail!("{} of {} runs failed or could not be saved.", failures, reports.len());
    }
    info!("Simulation Complete.");
    Ok(())
}
