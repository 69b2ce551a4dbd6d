pub mod config;
pub mod simulation;
pub mod source;

pub use config::SimulationConfig;
pub use simulation::{CancelToken, Simulation, SimulationReport};
pub use source::PencilBeam;
