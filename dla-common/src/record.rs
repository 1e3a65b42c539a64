use serde::{Serialize, Deserialize};

/// One occupied lattice cell as exported to the row-oriented output.
/// Field order defines the CSV header: `x,y,z,step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRecord {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    /// Launch step at which the cell was occupied (always > 0).
    pub step: u32,
}

/// Scalar description of a finished run, written next to the lattice export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub lattice_width: u32,
    pub lattice_height: u32,
    pub sticking_probability: f64,
    /// Final value of the step counter (equals the number of launches).
    pub final_step: u32,
    pub launched: u64,
    pub deposited: u64,
    pub escaped: u64,
    /// Particles abandoned after too many consecutive blocked moves.
    pub stuck: u64,
    /// Particles launched into an already occupied cell.
    pub blocked: u64,
    /// Seed of the run's random stream.
    pub seed: u64,
    pub elapsed_secs: f64,
}
