//! Background photon sources
//!
//! A background generator produces the mean number of background photons per
//! pixel for each frame. Shot noise is applied later by the noise pipeline
//! together with the emitter signal.

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use shared::PixelShape;

use crate::hardware::{require, ConfigError};

pub trait BackgroundGenerator: Send + fmt::Debug {
    /// Mean background photons per pixel for the next frame, shaped
    /// `resolution.array_dim()`.
    fn generate(&mut self, resolution: PixelShape) -> Array2<f64>;
}

/// Reject a generated background whose shape differs from the sensor
pub fn check_shape(background: &Array2<f64>, resolution: PixelShape) -> Result<(), ConfigError> {
    let found = PixelShape::from_array_dim(background.dim());
    if found == resolution {
        Ok(())
    } else {
        Err(ConfigError::BackgroundShape {
            expected: resolution,
            found,
        })
    }
}

/// Same photon level on every pixel
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBackground {
    photons: f64,
}

impl UniformBackground {
    pub fn new(photons: f64) -> Result<Self, ConfigError> {
        require(
            photons.is_finite() && photons >= 0.0,
            "background",
            "photons",
            "finite and non-negative",
            photons,
        )?;
        Ok(Self { photons })
    }
}

impl BackgroundGenerator for UniformBackground {
    fn generate(&mut self, resolution: PixelShape) -> Array2<f64> {
        Array2::from_elem(resolution.array_dim(), self.photons)
    }
}

/// Linear ramp from the left edge to the right edge, e.g. uneven illumination
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBackground {
    left: f64,
    right: f64,
}

impl GradientBackground {
    pub fn new(left: f64, right: f64) -> Result<Self, ConfigError> {
        for (field, value) in [("left", left), ("right", right)] {
            require(
                value.is_finite() && value >= 0.0,
                "background",
                field,
                "finite and non-negative",
                value,
            )?;
        }
        Ok(Self { left, right })
    }
}

impl BackgroundGenerator for GradientBackground {
    fn generate(&mut self, resolution: PixelShape) -> Array2<f64> {
        let span = resolution.width.saturating_sub(1).max(1) as f64;
        Array2::from_shape_fn(resolution.array_dim(), |(_, x)| {
            self.left + (self.right - self.left) * x as f64 / span
        })
    }
}

/// Fixed per-pixel map
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayBackground {
    photons: Array2<f64>,
}

impl ArrayBackground {
    pub fn new(photons: Array2<f64>) -> Result<Self, ConfigError> {
        if let Some(&bad) = photons.iter().find(|v| !(v.is_finite() && **v >= 0.0)) {
            return Err(ConfigError::OutOfRange {
                component: "background",
                field: "photons",
                requirement: "finite and non-negative",
                value: bad,
            });
        }
        Ok(Self { photons })
    }
}

impl BackgroundGenerator for ArrayBackground {
    fn generate(&mut self, _resolution: PixelShape) -> Array2<f64> {
        self.photons.clone()
    }
}

/// Serializable description of the background source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum BackgroundConfig {
    #[default]
    None,
    Uniform {
        photons: f64,
    },
    Gradient {
        left: f64,
        right: f64,
    },
    Map {
        photons: Array2<f64>,
    },
}

impl BackgroundConfig {
    /// Build the generator. A map must match `resolution`.
    pub fn build(
        &self,
        resolution: PixelShape,
    ) -> Result<Option<Box<dyn BackgroundGenerator>>, ConfigError> {
        Ok(match self {
            BackgroundConfig::None => None,
            BackgroundConfig::Uniform { photons } => Some(Box::new(UniformBackground::new(*photons)?)),
            BackgroundConfig::Gradient { left, right } => {
                Some(Box::new(GradientBackground::new(*left, *right)?))
            }
            BackgroundConfig::Map { photons } => {
                check_shape(photons, resolution)?;
                Some(Box::new(ArrayBackground::new(photons.clone())?))
            }
        })
    }
}
