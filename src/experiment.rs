use crate::run::{execute_run, ProgressSink, RunOutput};
use anyhow::Result;
use dla_common::{RunMetadata, SimulationConfig};
use log::{error, info};
use rand::Rng;
use rayon::prelude::*;

/// Receives each finished run, in sweep order.
pub trait RunSink {
    fn accept(&mut self, output: RunOutput) -> Result<()>;
}

/// Keeps finished runs in memory.
impl RunSink for Vec<RunOutput> {
    fn accept(&mut self, output: RunOutput) -> Result<()> {
        self.push(output);
        Ok(())
    }
}

/// What happened to one sticking probability of the sweep.
#[derive(Debug)]
pub struct RunReport {
    pub sticking_probability: f64,
    pub seed: u64,
    /// Metadata of the finished run, or the error that aborted it.
    pub result: Result<RunMetadata>,
    /// Set when the run finished but the sink could not store it.
    pub export_error: Option<anyhow::Error>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok() && self.export_error.is_none()
    }
}

/// Sweeps the configured sticking probabilities, one independent run each.
pub struct Experiment {
    config: SimulationConfig,
    base_seed: u64,
}

impl Experiment {
    /// Uses the configured seed, or draws one from OS entropy and logs it.
    pub fn new(config: SimulationConfig) -> Self {
        let base_seed = match config.rng.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::rng().random::<u64>();
                info!("No seed configured; using base seed {} (set [rng] seed to replay).", seed);
                seed
            }
        };
        Self::with_seed(config, base_seed)
    }

    pub fn with_seed(config: SimulationConfig, base_seed: u64) -> Self {
        Self { config, base_seed }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Seed of the run at position `index` of the sweep. Independent of execution mode.
    pub fn run_seed(&self, index: usize) -> u64 {
        self.base_seed.wrapping_add(index as u64)
    }

    /// Runs every sticking probability and forwards each finished run to `sink`.
    /// A failing run or export is recorded in its report; the sweep always continues.
    pub fn run(&self, sink: &mut dyn RunSink, progress: &dyn ProgressSink) -> Vec<RunReport> {
        let probabilities = &self.config.deposition.sticking_probabilities;
        info!(
            "Sweeping {} sticking probabilities (base seed {}, {}).",
            probabilities.len(),
            self.base_seed,
            if self.config.execution.parallel { "parallel" } else { "serial" }
        );

        if self.config.execution.parallel {
            info!("Using {} Rayon threads.", rayon::current_num_threads());
            let outputs: Vec<(f64, u64, Result<RunOutput>)> = probabilities
                .par_iter()
                .enumerate()
                .map(|(idx, &p)| {
                    let seed = self.run_seed(idx);
                    (p, seed, execute_run(self.config.run_params(p), seed, progress))
                })
                .collect();

            outputs
                .into_iter()
                .map(|(p, seed, output)| forward(p, seed, output, &mut *sink))
                .collect()
        } else {
            probabilities
                .iter()
                .enumerate()
                .map(|(idx, &p)| {
                    let seed = self.run_seed(idx);
                    let output = execute_run(self.config.run_params(p), seed, progress);
                    forward(p, seed, output, &mut *sink)
                })
                .collect()
        }
    }
}

fn forward(p: f64, seed: u64, output: Result<RunOutput>, sink: &mut dyn RunSink) -> RunReport {
    match output {
        Ok(output) => {
            let metadata = output.metadata.clone();
            let export_error = match sink.accept(output) {
                Ok(()) => None,
                Err(e) => {
                    error!("Failed to export run p = {:.3}: {:#}", p, e);
                    Some(e)
                }
            };
            RunReport { sticking_probability: p, seed, result: Ok(metadata), export_error }
        }
        Err(e) => {
            error!("Run p = {:.3} failed: {:#}", p, e);
            RunReport { sticking_probability: p, seed, result: Err(e), export_error: None }
        }
    }
}
