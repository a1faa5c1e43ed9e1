//! Camera configuration for simulating detector characteristics

use serde::{Deserialize, Serialize};
use shared::PixelShape;

use super::{require, ConfigError};

/// Configuration for a camera detector
///
/// All noise terms are expressed in electrons per pixel per frame. The
/// digitization chain is `ADU = electrons * adu_per_electron + baseline_adu`,
/// saturating at `2^bit_depth - 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Name/model of the camera
    pub name: String,
    /// Sensor resolution in pixels
    pub resolution: PixelShape,
    /// Physical pixel pitch in microns
    pub pixel_size_um: f64,
    /// Readout noise RMS in electrons
    pub readout_noise_e: f64,
    /// Thermal noise RMS in electrons
    pub thermal_noise_e: f64,
    /// Mean dark-current electrons per pixel per frame
    pub dark_current_e: f64,
    /// Fraction of incident photons converted to photo-electrons
    pub quantum_efficiency: f64,
    /// Electron-multiplying gain; 0 disables the EM stage
    pub em_gain: f64,
    /// Conversion gain in ADU per electron
    pub adu_per_electron: f64,
    /// Constant offset added to every pixel, in ADU
    pub baseline_adu: f64,
    /// ADC bit depth
    pub bit_depth: u8,
}

impl Camera {
    /// Create a new camera configuration
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        resolution: PixelShape,
        pixel_size_um: f64,
        readout_noise_e: f64,
        thermal_noise_e: f64,
        dark_current_e: f64,
        quantum_efficiency: f64,
        em_gain: f64,
        adu_per_electron: f64,
        baseline_adu: f64,
        bit_depth: u8,
    ) -> Result<Self, ConfigError> {
        let camera = Self {
            name: name.into(),
            resolution,
            pixel_size_um,
            readout_noise_e,
            thermal_noise_e,
            dark_current_e,
            quantum_efficiency,
            em_gain,
            adu_per_electron,
            baseline_adu,
            bit_depth,
        };
        camera.validate()?;
        Ok(camera)
    }

    /// Noise-free camera with unit conversion gain, useful as a reference.
    pub fn ideal(resolution: PixelShape, pixel_size_um: f64) -> Result<Self, ConfigError> {
        Self::new(
            "Ideal",
            resolution,
            pixel_size_um,
            0.0,
            0.0,
            0.0,
            1.0,
            0.0,
            1.0,
            0.0,
            16,
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        const C: &str = "camera";
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(ConfigError::Invalid {
                component: C,
                message: format!("resolution must be non-empty, got {}", self.resolution),
            });
        }
        require(
            self.pixel_size_um.is_finite() && self.pixel_size_um > 0.0,
            C,
            "pixel_size_um",
            "positive",
            self.pixel_size_um,
        )?;
        for (field, value) in [
            ("readout_noise_e", self.readout_noise_e),
            ("thermal_noise_e", self.thermal_noise_e),
            ("dark_current_e", self.dark_current_e),
            ("em_gain", self.em_gain),
            ("baseline_adu", self.baseline_adu),
        ] {
            require(
                value.is_finite() && value >= 0.0,
                C,
                field,
                "finite and non-negative",
                value,
            )?;
        }
        require(
            self.quantum_efficiency > 0.0 && self.quantum_efficiency <= 1.0,
            C,
            "quantum_efficiency",
            "in (0, 1]",
            self.quantum_efficiency,
        )?;
        require(
            self.adu_per_electron.is_finite() && self.adu_per_electron > 0.0,
            C,
            "adu_per_electron",
            "positive",
            self.adu_per_electron,
        )?;
        require(
            (1..=16).contains(&self.bit_depth),
            C,
            "bit_depth",
            "between 1 and 16",
            self.bit_depth as f64,
        )?;
        Ok(())
    }

    /// Largest representable pixel value in ADU
    pub fn max_adu(&self) -> f64 {
        ((1u32 << self.bit_depth) - 1) as f64
    }

    /// Combined standard deviation of the additive Gaussian terms
    pub fn additive_noise_e(&self) -> f64 {
        self.readout_noise_e.hypot(self.thermal_noise_e)
    }

    pub fn has_em_gain(&self) -> bool {
        self.em_gain > 0.0
    }

    /// Returns a copy with a different sensor resolution
    pub fn with_resolution(&self, resolution: PixelShape) -> Self {
        let mut camera = self.clone();
        camera.resolution = resolution;
        camera
    }
}
