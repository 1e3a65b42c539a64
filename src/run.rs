use crate::coord::Site;
use crate::lattice::Lattice;
use crate::walker::{RandomWalker, WalkOutcome};
use anyhow::{Context, Result};
use dla_common::{RunMetadata, RunParams};
use log::{debug, info, warn};
use rand::distr::Uniform;
use rand::prelude::*;
use std::time::Instant;

/// Per-run counters. All of them only ever increase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Launch index, also the value written into deposited cells.
    pub step: u32,
    pub launched: u64,
    pub deposited: u64,
    pub escaped: u64,
    pub stuck: u64,
    /// Particles launched into an occupied cell.
    pub blocked: u64,
    /// Simulated time summed over all walks.
    pub walk_ticks: u64,
}

/// Progress notification emitted each time the deposit count reaches a multiple of the report interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub sticking_probability: f64,
    pub deposited: u64,
    pub launched: u64,
}

/// Observer for run progress. Has no influence on the simulation.
pub trait ProgressSink: Sync {
    fn report(&self, progress: &Progress);
}

/// Default sink: one `info!` line per notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, progress: &Progress) {
        info!(
            "p = {:.3} | Deposited: {} | Launched: {}",
            progress.sticking_probability, progress.deposited, progress.launched
        );
    }
}

/// Finished lattice plus the metadata handed to the export collaborator.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub lattice: Lattice,
    pub metadata: RunMetadata,
}

/// Grows one lattice to the target number of deposits at a single sticking probability.
pub struct SimulationRun {
    params: RunParams,
    lattice: Lattice,
    counters: RunCounters,
    rng: StdRng,
    seed: u64,
    spawn_xy: Uniform<i32>,
    spawn_z: Uniform<i32>,
}

impl SimulationRun {
    /// Allocates a fresh lattice and seeds the run's random stream.
    pub fn new(params: RunParams, seed: u64) -> Result<Self> {
        let lattice = Lattice::new(params.lattice_width, params.lattice_height).with_context(|| {
            format!("Failed to create lattice for p = {}", params.sticking_probability)
        })?;

        let width = i32::try_from(params.lattice_width).context("lattice width does not fit in i32")?;
        let spawn_xy = Uniform::new(0, width)?;
        let spawn_z = Uniform::new_inclusive(params.spawn_min_z, params.spawn_max_z)?;

        debug!("Run parameters: {:#?}", params);

        Ok(Self {
            params,
            lattice,
            counters: RunCounters::default(),
            rng: StdRng::seed_from_u64(seed),
            seed,
            spawn_xy,
            spawn_z,
        })
    }

    /// Launches one particle and walks it to completion.
    pub fn step(&mut self, progress: &dyn ProgressSink) -> Result<WalkOutcome> {
        self.counters.step = self
            .counters
            .step
            .checked_add(1)
            .context("step counter overflowed u32")?;
        self.counters.launched += 1;

        let start = Site::new(
            self.rng.sample(self.spawn_xy),
            self.rng.sample(self.spawn_xy),
            self.rng.sample(self.spawn_z),
        );

        let report = RandomWalker::new(
            &mut self.lattice,
            self.params.sticking_probability,
            self.params.max_rejected_moves,
        )
        .walk(start, self.counters.step, &mut self.rng);
        self.counters.walk_ticks += report.ticks;

        match report.outcome {
            WalkOutcome::Deposited(_) => {
                self.counters.deposited += 1;
                if self.counters.deposited % self.params.report_interval == 0 {
                    progress.report(&Progress {
                        sticking_probability: self.params.sticking_probability,
                        deposited: self.counters.deposited,
                        launched: self.counters.launched,
                    });
                }
            }
            WalkOutcome::Escaped => self.counters.escaped += 1,
            WalkOutcome::Stuck(site) => {
                self.counters.stuck += 1;
                warn!(
                    "Particle {} stuck at ({}, {}, {}) after {} blocked moves; discarded.",
                    self.counters.step, site.x, site.y, site.z, self.params.max_rejected_moves
                );
            }
            WalkOutcome::Blocked(site) => {
                self.counters.blocked += 1;
                debug!(
                    "Particle {} launched into occupied cell ({}, {}, {}); discarded.",
                    self.counters.step, site.x, site.y, site.z
                );
            }
        }

        Ok(report.outcome)
    }

    /// Launches particles until the deposit target is reached.
    pub fn run_to_target(&mut self, progress: &dyn ProgressSink) -> Result<()> {
        while !self.is_complete() {
            self.step(progress)?;
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.counters.deposited >= self.params.target_deposits
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    pub fn params(&self) -> &RunParams {
        &self.params
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Consumes the run, producing the lattice and its metadata.
    pub fn into_output(self, elapsed_secs: f64) -> RunOutput {
        let metadata = RunMetadata {
            lattice_width: self.params.lattice_width,
            lattice_height: self.params.lattice_height,
            sticking_probability: self.params.sticking_probability,
            final_step: self.counters.step,
            launched: self.counters.launched,
            deposited: self.counters.deposited,
            escaped: self.counters.escaped,
            stuck: self.counters.stuck,
            blocked: self.counters.blocked,
            seed: self.seed,
            elapsed_secs,
        };
        RunOutput { lattice: self.lattice, metadata }
    }
}

/// Builds, runs and finishes one run. Errors only affect this run.
pub fn execute_run(params: RunParams, seed: u64, progress: &dyn ProgressSink) -> Result<RunOutput> {
    let start_time = Instant::now();
    let p = params.sticking_probability;
    info!("Starting run p = {:.3} (seed {}, target {} deposits)", p, seed, params.target_deposits);

    let mut run = SimulationRun::new(params, seed)?;
    run.run_to_target(progress)?;

    let elapsed = start_time.elapsed().as_secs_f64();
    let counters = run.counters();
    info!(
        "Run p = {:.3} finished in {:.3} s | Launched: {} | Deposited: {} | Escaped: {} | Stuck: {} | Blocked: {} | Final step: {}",
        p, elapsed, counters.launched, counters.deposited, counters.escaped, counters.stuck, counters.blocked, counters.step
    );
    Ok(run.into_output(elapsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Progress>>);

    impl ProgressSink for Recorder {
        fn report(&self, progress: &Progress) {
            self.0.lock().unwrap().push(*progress);
        }
    }

    fn small_params(p: f64, target: u64) -> RunParams {
        RunParams {
            lattice_width: 6,
            lattice_height: 10,
            spawn_min_z: 6,
            spawn_max_z: 9,
            sticking_probability: p,
            target_deposits: target,
            max_rejected_moves: 10_000,
            report_interval: 5,
        }
    }

    #[test]
    fn step_increments_launch_counters_together() {
        let mut run = SimulationRun::new(small_params(0.5, 10), 3).unwrap();
        for i in 1..=4u32 {
            run.step(&LogProgress).unwrap();
            assert_eq!(run.counters().step, i);
            assert_eq!(run.counters().launched, i as u64);
        }
    }

    #[test]
    fn progress_reported_once_per_interval() {
        let recorder = Recorder::default();
        let mut run = SimulationRun::new(small_params(0.7, 15), 21).unwrap();
        run.run_to_target(&recorder).unwrap();

        let seen = recorder.0.into_inner().unwrap();
        let deposits: Vec<u64> = seen.iter().map(|p| p.deposited).collect();
        assert_eq!(deposits, vec![5, 10, 15]);
        assert!(seen.iter().all(|p| p.launched >= p.deposited && p.sticking_probability == 0.7));
    }

    #[test]
    fn spawn_band_reaching_top_escapes() {
        // Every spawn lands at z = H_total, outside the lattice.
        let mut params = small_params(1.0, 1);
        params.spawn_min_z = 10;
        params.spawn_max_z = 10;
        let mut run = SimulationRun::new(params, 5).unwrap();
        for _ in 0..10 {
            assert_eq!(run.step(&LogProgress).unwrap(), WalkOutcome::Escaped);
        }
        assert_eq!(run.counters().escaped, 10);
        assert_eq!(run.counters().deposited, 0);
        assert!(!run.is_complete());
    }

    #[test]
    fn into_output_carries_final_counters() {
        let mut run = SimulationRun::new(small_params(1.0, 8), 17).unwrap();
        run.run_to_target(&LogProgress).unwrap();
        let counters = run.counters().clone();
        let output = run.into_output(0.25);

        assert_eq!(output.metadata.final_step, counters.step);
        assert_eq!(output.metadata.deposited, 8);
        assert_eq!(output.metadata.seed, 17);
        assert_eq!(output.metadata.elapsed_secs, 0.25);
        assert_eq!(output.lattice.occupied_count(), 8);
    }

    #[test]
    fn oversized_lattice_fails_the_run_not_the_process() {
        let mut params = small_params(0.5, 1);
        params.lattice_width = u32::MAX / 2;
        params.lattice_height = u32::MAX / 2;
        assert!(SimulationRun::new(params, 1).is_err());
    }
}
