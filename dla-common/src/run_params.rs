use serde::{Deserialize, Serialize};

/// Parameters of a single run derived from the configuration, read on every particle launch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunParams {
    // Lattice
    pub lattice_width: u32,  // L, periodic in x and y
    pub lattice_height: u32, // H_total, bounded in z

    // Spawn band (inclusive)
    pub spawn_min_z: i32,
    pub spawn_max_z: i32,

    // Deposition
    pub sticking_probability: f64,
    pub target_deposits: u64,
    pub max_rejected_moves: u32,

    // Reporting
    pub report_interval: u64,
}
