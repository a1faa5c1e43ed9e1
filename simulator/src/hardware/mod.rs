//! Hardware configuration records for the simulated microscope
//!
//! Camera, laser, objective and stage values are plain records that are
//! validated before a microscope is built from them. They carry no behaviour
//! beyond unit conversions and read accessors.

pub mod camera;
pub mod laser;
pub mod models;
pub mod objective;
pub mod stage;

pub use camera::Camera;
pub use laser::Laser;
pub use objective::Objective;
pub use stage::Stage;

use shared::PixelShape;
use thiserror::Error;

/// Invalid configuration value detected at construction time
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{component}: {field} must be {requirement}, got {value}")]
    OutOfRange {
        component: &'static str,
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },
    #[error("{component}: {message}")]
    Invalid {
        component: &'static str,
        message: String,
    },
    #[error("Background map is {found}, camera resolution is {expected}")]
    BackgroundShape {
        expected: PixelShape,
        found: PixelShape,
    },
}

/// Check a numeric field, producing an [`ConfigError::OutOfRange`] on failure.
pub(crate) fn require(
    ok: bool,
    component: &'static str,
    field: &'static str,
    requirement: &'static str,
    value: f64,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            component,
            field,
            requirement,
            value,
        })
    }
}
