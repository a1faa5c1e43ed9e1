//! Illumination laser configuration

use serde::{Deserialize, Serialize};

use super::{require, ConfigError};

/// Excitation/activation laser.
///
/// Power is expressed in the same arbitrary units the fluorophore rate slopes
/// are defined in. The current power always stays inside
/// `[min_power, max_power]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Laser {
    /// Emission wavelength in nanometres
    pub wavelength_nm: f64,
    /// Current output power
    pub power: f64,
    /// Lowest settable power
    pub min_power: f64,
    /// Highest settable power
    pub max_power: f64,
}

impl Laser {
    pub fn new(
        wavelength_nm: f64,
        power: f64,
        min_power: f64,
        max_power: f64,
    ) -> Result<Self, ConfigError> {
        let laser = Self {
            wavelength_nm,
            power,
            min_power,
            max_power,
        };
        laser.validate()?;
        Ok(laser)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        const C: &str = "laser";
        require(
            self.wavelength_nm.is_finite() && self.wavelength_nm > 0.0,
            C,
            "wavelength_nm",
            "positive",
            self.wavelength_nm,
        )?;
        require(
            self.min_power.is_finite() && self.min_power >= 0.0,
            C,
            "min_power",
            "finite and non-negative",
            self.min_power,
        )?;
        require(
            self.max_power.is_finite() && self.max_power >= self.min_power,
            C,
            "max_power",
            "finite and at least min_power",
            self.max_power,
        )?;
        require(
            self.power >= self.min_power && self.power <= self.max_power,
            C,
            "power",
            "within [min_power, max_power]",
            self.power,
        )?;
        Ok(())
    }

    /// Set the output power, saturating at the configured limits.
    ///
    /// Returns the power actually applied.
    pub fn set_power(&mut self, power: f64) -> f64 {
        self.power = power.clamp(self.min_power, self.max_power);
        self.power
    }

    pub fn power_range(&self) -> (f64, f64) {
        (self.min_power, self.max_power)
    }
}
