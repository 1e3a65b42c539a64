pub mod config;
pub mod record;
pub mod run_params;

// Re-export key types for easier use by dependent crates
pub use config::{SimulationConfig, LatticeConfig, SpawnConfig, DepositionConfig, ProgressConfig, RngConfig, ExecutionConfig, OutputConfig};
pub use record::{CellRecord, RunMetadata};
pub use run_params::RunParams;
