//! Single-molecule fluorescence microscope frame simulation
//!
//! This crate simulates a widefield fluorescence microscope imaging a
//! population of blinking, bleaching point emitters. Each frame advances every
//! emitter's photophysical state, renders the emitted photons through a
//! Gaussian PSF and passes the result through a camera noise model.
//!
//! The main entry points are [`Microscope`] for a single simulated instrument
//! and [`SimulationManager`] for many concurrent instances addressed by id.

pub mod error;
pub mod events;
pub mod hardware;
pub mod image_proc;
pub mod optics;
pub mod photophysics;
pub mod scene;
pub mod sims;

pub use error::SimulationError;
pub use events::{EventListener, SimulationEvent};
pub use hardware::{Camera, ConfigError, Laser, Objective, Stage};
pub use optics::{PointSpreadFunction, Position, PsfConfig};
pub use photophysics::{Fluorophore, RateModel, StateId, StateSystem};
pub use sims::{Microscope, MicroscopeConfig, Simulation, SimulationManager};
