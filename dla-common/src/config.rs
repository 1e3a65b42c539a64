use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::run_params::RunParams;
use std::path::Path;

// Lattice geometry: L x L periodic footprint, H_total bounded height
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LatticeConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

// Band of heights new particles are launched from: [min_height, min_height + band]
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SpawnConfig {
    #[serde(default = "default_spawn_min_height")]
    pub min_height: u32,
    #[serde(default = "default_spawn_band")]
    pub band: u32,
}

// Sticking behaviour and per-run stopping condition
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DepositionConfig {
    /// Sticking probabilities to sweep, in the order they are run.
    #[serde(default = "default_sticking_probabilities")]
    pub sticking_probabilities: Vec<f64>,
    /// Number of successful depositions that ends a run.
    #[serde(default = "default_target_deposits")]
    pub target_deposits: u64,
    /// Consecutive blocked moves after which a particle is declared stuck.
    #[serde(default = "default_max_rejected_moves")]
    pub max_rejected_moves: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ProgressConfig {
    #[serde(default = "default_report_interval")]
    pub report_interval: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct RngConfig {
    /// Base seed for the experiment. Drawn from OS entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ExecutionConfig {
    /// Run the sticking probabilities concurrently on the rayon pool.
    #[serde(default)]
    pub parallel: bool,
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_base_directory")]
    pub base_directory: String,
    #[serde(default = "default_true")]
    pub save_positions: bool,
    #[serde(default = "default_true")]
    pub save_metadata: bool,
    /// Gzip the lattice export (`.csv.gz`).
    #[serde(default = "default_true")]
    pub compress: bool,
}

// Main simulation configuration structure, loaded from config.toml.
// Every section may be omitted; missing values fall back to the defaults below.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SimulationConfig {
    #[serde(default)]
    pub lattice: LatticeConfig,
    #[serde(default)]
    pub spawn: SpawnConfig,
    #[serde(default)]
    pub deposition: DepositionConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub rng: RngConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        LatticeConfig { width: default_width(), height: default_height() }
    }
}

impl Default for SpawnConfig {
    fn default() -> Self {
        SpawnConfig { min_height: default_spawn_min_height(), band: default_spawn_band() }
    }
}

impl Default for DepositionConfig {
    fn default() -> Self {
        DepositionConfig {
            sticking_probabilities: default_sticking_probabilities(),
            target_deposits: default_target_deposits(),
            max_rejected_moves: default_max_rejected_moves(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        ProgressConfig { report_interval: default_report_interval() }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_directory: default_base_directory(),
            save_positions: true,
            save_metadata: true,
            compress: true,
        }
    }
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;

        Ok(config)
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the engine relies on before any lattice is allocated.
    pub fn validate(&self) -> Result<()> {
        if self.lattice.width == 0 {
            anyhow::bail!("lattice.width must be greater than 0.");
        }
        if self.lattice.height == 0 {
            anyhow::bail!("lattice.height must be greater than 0.");
        }
        if i32::try_from(self.lattice.width).is_err() || i32::try_from(self.lattice.height).is_err() {
            anyhow::bail!("lattice dimensions must fit in a signed 32-bit coordinate.");
        }
        if i32::try_from(self.spawn.min_height as u64 + self.spawn.band as u64).is_err() {
            anyhow::bail!("spawn.min_height + spawn.band must fit in a signed 32-bit coordinate.");
        }
        // Launches above the top layer escape at once, so the band must start inside the lattice.
        if self.spawn.min_height >= self.lattice.height {
            anyhow::bail!(
                "spawn.min_height ({}) must be below lattice.height ({}).",
                self.spawn.min_height,
                self.lattice.height
            );
        }
        if self.deposition.sticking_probabilities.is_empty() {
            anyhow::bail!("deposition.sticking_probabilities must list at least one value.");
        }
        for &p in &self.deposition.sticking_probabilities {
            if !(0.0..=1.0).contains(&p) {
                anyhow::bail!("sticking probability {} is outside [0, 1].", p);
            }
        }
        if self.deposition.target_deposits == 0 {
            anyhow::bail!("deposition.target_deposits must be greater than 0.");
        }
        let capacity = self.lattice.width as u64 * self.lattice.width as u64 * self.lattice.height as u64;
        if self.deposition.target_deposits > capacity {
            anyhow::bail!(
                "deposition.target_deposits ({}) exceeds the lattice capacity ({} cells).",
                self.deposition.target_deposits,
                capacity
            );
        }
        // Without sticking only the floor can fill up.
        let floor = self.lattice.width as u64 * self.lattice.width as u64;
        if self.deposition.sticking_probabilities.contains(&0.0) && self.deposition.target_deposits > floor {
            anyhow::bail!(
                "deposition.target_deposits ({}) exceeds the floor area ({} cells), unreachable with sticking probability 0.",
                self.deposition.target_deposits,
                floor
            );
        }
        if self.deposition.max_rejected_moves == 0 {
            anyhow::bail!("deposition.max_rejected_moves must be greater than 0.");
        }
        if self.progress.report_interval == 0 {
            anyhow::bail!("progress.report_interval must be greater than 0.");
        }
        Ok(())
    }

    /// Converts the configuration into the parameters of a single run at sticking probability `p`.
    pub fn run_params(&self, sticking_probability: f64) -> RunParams {
        let spawn_min_z = self.spawn.min_height as i32;
        let spawn_max_z = self.spawn.min_height.saturating_add(self.spawn.band) as i32;

        RunParams {
            lattice_width: self.lattice.width,
            lattice_height: self.lattice.height,
            spawn_min_z,
            spawn_max_z,
            sticking_probability,
            target_deposits: self.deposition.target_deposits,
            report_interval: self.progress.report_interval,
            max_rejected_moves: self.deposition.max_rejected_moves,
        }
    }
}

// Defaults reproduce the reference thin-film experiment
fn default_width() -> u32 {
    100
}

fn default_height() -> u32 {
    600
}

fn default_spawn_min_height() -> u32 {
    400
}

fn default_spawn_band() -> u32 {
    200
}

fn default_sticking_probabilities() -> Vec<f64> {
    vec![0.1, 0.2, 0.4, 0.6, 0.8, 1.0]
}

fn default_target_deposits() -> u64 {
    50_000
}

fn default_max_rejected_moves() -> u32 {
    100_000
}

fn default_report_interval() -> u64 {
    10_000
}

fn default_base_directory() -> String {
    "output".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_reference_defaults() {
        let config = SimulationConfig::from_toml_str("").unwrap();
        assert_eq!(config.lattice.width, 100);
        assert_eq!(config.lattice.height, 600);
        assert_eq!(config.spawn.min_height, 400);
        assert_eq!(config.spawn.band, 200);
        assert_eq!(config.deposition.sticking_probabilities, vec![0.1, 0.2, 0.4, 0.6, 0.8, 1.0]);
        assert_eq!(config.deposition.target_deposits, 50_000);
        assert_eq!(config.progress.report_interval, 10_000);
        assert!(config.rng.seed.is_none());
        assert!(!config.execution.parallel);
        assert!(config.output.compress);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [lattice]
            width = 8

            [deposition]
            target_deposits = 100

            [rng]
            seed = 42
            "#,
        )
        .unwrap();
        assert_eq!(config.lattice.width, 8);
        assert_eq!(config.lattice.height, 600);
        assert_eq!(config.deposition.target_deposits, 100);
        assert_eq!(config.deposition.sticking_probabilities, vec![0.1, 0.2, 0.4, 0.6, 0.8, 1.0]);
        assert_eq!(config.rng.seed, Some(42));
    }

    #[test]
    fn rejects_probability_out_of_range() {
        let err = SimulationConfig::from_toml_str(
            r#"
            [deposition]
            sticking_probabilities = [0.5, 1.5]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("1.5"));
    }

    #[test]
    fn rejects_target_larger_than_lattice() {
        let err = SimulationConfig::from_toml_str(
            r#"
            [lattice]
            width = 2
            height = 2

            [spawn]
            min_height = 1
            band = 1

            [deposition]
            target_deposits = 9
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("capacity"));
    }

    #[test]
    fn rejects_unreachable_target_without_sticking() {
        let err = SimulationConfig::from_toml_str(
            r#"
            [lattice]
            width = 3
            height = 10

            [spawn]
            min_height = 6
            band = 3

            [deposition]
            sticking_probabilities = [0.0, 0.5]
            target_deposits = 10
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("floor area"));
    }

    #[test]
    fn rejects_spawn_band_above_lattice() {
        let err = SimulationConfig::from_toml_str(
            r#"
            [lattice]
            width = 4
            height = 5

            [spawn]
            min_height = 10
            band = 0

            [deposition]
            target_deposits = 1
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("spawn.min_height"));

        // starting exactly at the top layer is also outside
        assert!(SimulationConfig::from_toml_str(
            "[lattice]\nwidth = 4\nheight = 5\n[spawn]\nmin_height = 5\nband = 0\n[deposition]\ntarget_deposits = 1"
        )
        .is_err());
    }

    #[test]
    fn spawn_band_may_reach_lattice_top() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [lattice]
            width = 4
            height = 5

            [spawn]
            min_height = 3
            band = 2

            [deposition]
            target_deposits = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.run_params(0.5).spawn_max_z, 5);
    }

    #[test]
    fn rejects_zero_sized_lattice_and_empty_sweep() {
        assert!(SimulationConfig::from_toml_str("[lattice]\nwidth = 0").is_err());
        assert!(SimulationConfig::from_toml_str("[deposition]\nsticking_probabilities = []").is_err());
        assert!(SimulationConfig::from_toml_str("[progress]\nreport_interval = 0").is_err());
    }

    #[test]
    fn run_params_carry_spawn_band_as_signed_bounds() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [lattice]
            width = 4
            height = 5

            [spawn]
            min_height = 2
            band = 0

            [deposition]
            target_deposits = 1
            "#,
        )
        .unwrap();
        let params = config.run_params(0.25);
        assert_eq!(params.lattice_width, 4);
        assert_eq!(params.lattice_height, 5);
        assert_eq!(params.spawn_min_z, 2);
        assert_eq!(params.spawn_max_z, 2);
        assert_eq!(params.sticking_probability, 0.25);
        assert_eq!(params.target_deposits, 1);
    }
}
