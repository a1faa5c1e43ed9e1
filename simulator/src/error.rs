//! Crate-level error type

use shared::FrameError;
use thiserror::Error;

use crate::hardware::ConfigError;
use crate::optics::PsfError;
use crate::photophysics::StateSystemError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid state system: {0}")]
    StateSystem(#[from] StateSystemError),
    #[error("Invalid PSF: {0}")]
    Psf(#[from] PsfError),
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("Laser power must be finite, got {0}")]
    InvalidPower(f64),
    #[error("Unknown simulation {0}")]
    UnknownSimulation(u64),
    #[error("No template available: no simulation has been created yet")]
    NoTemplate,
}

pub type Result<T, E = SimulationError> = std::result::Result<T, E>;
