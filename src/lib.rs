//! Diffusion-limited deposition of particles onto a 3D lattice.
//!
//! Particles are launched above a periodic-in-x/y lattice, random-walk, and stick either
//! on the floor or, with a configurable probability, next to already deposited particles.

pub mod coord;
pub mod experiment;
pub mod export;
pub mod lattice;
pub mod run;
pub mod walker;

pub use coord::{Direction, Site};
pub use experiment::{Experiment, RunReport, RunSink};
pub use export::CsvExporter;
pub use lattice::Lattice;
pub use run::{LogProgress, Progress, ProgressSink, RunCounters, RunOutput, SimulationRun};
pub use walker::{RandomWalker, WalkOutcome, WalkReport};
