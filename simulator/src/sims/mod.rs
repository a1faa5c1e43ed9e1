//! Microscope orchestration and the simulation instance registry

pub mod manager;
pub mod microscope;

pub use manager::{Simulation, SimulationHandle, SimulationManager};
pub use microscope::{Microscope, MicroscopeConfig};
