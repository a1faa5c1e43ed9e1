//! Emitter placement strategies

use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::PixelShape;

use crate::hardware::{require, ConfigError};
use crate::optics::Position;

/// How the initial emitter population is placed on the sensor.
///
/// Coordinates are in camera pixels; depth is in microns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EmitterLayout {
    /// Fixed positions
    Explicit { positions: Vec<Position> },
    /// Positions drawn uniformly over the sensor area and depth range
    RandomUniform {
        count: usize,
        #[serde(default)]
        z_min_um: f64,
        #[serde(default)]
        z_max_um: f64,
    },
    /// Regular square grid, at least `margin_px` from every edge
    Grid {
        spacing_px: f64,
        #[serde(default)]
        margin_px: f64,
        #[serde(default)]
        z_um: f64,
    },
}

impl Default for EmitterLayout {
    fn default() -> Self {
        EmitterLayout::Explicit {
            positions: Vec::new(),
        }
    }
}

impl EmitterLayout {
    pub fn validate(&self) -> Result<(), ConfigError> {
        const C: &str = "layout";
        match self {
            EmitterLayout::Explicit { positions } => {
                if let Some(bad) = positions
                    .iter()
                    .find(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
                {
                    return Err(ConfigError::Invalid {
                        component: C,
                        message: format!("non-finite emitter position {bad:?}"),
                    });
                }
            }
            EmitterLayout::RandomUniform {
                z_min_um, z_max_um, ..
            } => {
                if !(z_min_um.is_finite() && z_max_um.is_finite() && z_min_um <= z_max_um) {
                    return Err(ConfigError::Invalid {
                        component: C,
                        message: format!("invalid depth range [{z_min_um}, {z_max_um}]"),
                    });
                }
            }
            EmitterLayout::Grid {
                spacing_px,
                margin_px,
                z_um,
            } => {
                require(
                    spacing_px.is_finite() && *spacing_px > 0.0,
                    C,
                    "spacing_px",
                    "positive",
                    *spacing_px,
                )?;
                require(
                    margin_px.is_finite() && *margin_px >= 0.0,
                    C,
                    "margin_px",
                    "finite and non-negative",
                    *margin_px,
                )?;
                require(z_um.is_finite(), C, "z_um", "finite", *z_um)?;
            }
        }
        Ok(())
    }

    /// Emitter positions for a sensor of `resolution`
    pub fn positions<R: Rng + ?Sized>(
        &self,
        resolution: PixelShape,
        rng: &mut R,
    ) -> Result<Vec<Position>, ConfigError> {
        self.validate()?;
        let (w, h) = (resolution.width as f64, resolution.height as f64);
        let positions = match self {
            EmitterLayout::Explicit { positions } => positions.clone(),
            EmitterLayout::RandomUniform {
                count,
                z_min_um,
                z_max_um,
            } => (0..*count)
                .map(|_| {
                    // Pixel i spans [i - 0.5, i + 0.5].
                    let x = rng.gen_range(0.0..w.max(f64::MIN_POSITIVE)) - 0.5;
                    let y = rng.gen_range(0.0..h.max(f64::MIN_POSITIVE)) - 0.5;
                    let z = if z_max_um > z_min_um {
                        rng.gen_range(*z_min_um..*z_max_um)
                    } else {
                        *z_min_um
                    };
                    Position::new(x, y, z)
                })
                .collect(),
            EmitterLayout::Grid {
                spacing_px,
                margin_px,
                z_um,
            } => {
                let axis = |extent: f64| {
                    let last = extent - 1.0 - margin_px;
                    let mut coords = Vec::new();
                    let mut c = *margin_px;
                    while c <= last {
                        coords.push(c);
                        c += spacing_px;
                    }
                    coords
                };
                let xs = axis(w);
                axis(h)
                    .into_iter()
                    .flat_map(|y| xs.iter().map(move |&x| Position::new(x, y, *z_um)))
                    .collect()
            }
        };
        Ok(positions)
    }
}
