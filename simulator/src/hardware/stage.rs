//! Sample stage position

use serde::{Deserialize, Serialize};

use super::{require, ConfigError};

/// Sample stage. Coordinates are in microns; `z_um` is the focal plane
/// position that defocus-aware PSFs measure emitter depth against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub x_um: f64,
    pub y_um: f64,
    pub z_um: f64,
}

impl Stage {
    pub fn new(x_um: f64, y_um: f64, z_um: f64) -> Result<Self, ConfigError> {
        let stage = Self { x_um, y_um, z_um };
        stage.validate()?;
        Ok(stage)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("x_um", self.x_um), ("y_um", self.y_um), ("z_um", self.z_um)] {
            require(value.is_finite(), "stage", field, "finite", value)?;
        }
        Ok(())
    }
}
