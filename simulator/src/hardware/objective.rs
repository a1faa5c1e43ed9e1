//! Objective lens configuration

use serde::{Deserialize, Serialize};

use super::{require, ConfigError};

/// Ratio between the FWHM of a diffraction-limited spot and `λ / NA`.
pub const FWHM_PER_WAVELENGTH_OVER_NA: f64 = 0.51;

/// Microscope objective
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub numerical_aperture: f64,
    pub magnification: f64,
}

impl Objective {
    pub fn new(numerical_aperture: f64, magnification: f64) -> Result<Self, ConfigError> {
        let objective = Self {
            numerical_aperture,
            magnification,
        };
        objective.validate()?;
        Ok(objective)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        const C: &str = "objective";
        require(
            self.numerical_aperture > 0.0 && self.numerical_aperture <= 1.7,
            C,
            "numerical_aperture",
            "in (0, 1.7]",
            self.numerical_aperture,
        )?;
        require(
            self.magnification.is_finite() && self.magnification > 0.0,
            C,
            "magnification",
            "positive",
            self.magnification,
        )?;
        Ok(())
    }

    /// Size of one camera pixel projected into the sample plane, in microns
    pub fn object_pixel_size_um(&self, camera_pixel_size_um: f64) -> f64 {
        camera_pixel_size_um / self.magnification
    }

    /// Diffraction-limited FWHM in the sample plane, in microns
    pub fn fwhm_um(&self, wavelength_nm: f64) -> f64 {
        FWHM_PER_WAVELENGTH_OVER_NA * (wavelength_nm / 1000.0) / self.numerical_aperture
    }

    /// Diffraction-limited FWHM in camera pixels
    pub fn fwhm_pixels(&self, wavelength_nm: f64, camera_pixel_size_um: f64) -> f64 {
        self.fwhm_um(wavelength_nm) / self.object_pixel_size_um(camera_pixel_size_um)
    }
}
