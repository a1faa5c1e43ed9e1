//! Static scene content drawn before the emitters
//!
//! Obstructors write directly into the noiseless photon accumulator each
//! frame. Fiducial beads are the common case: bright, always-on markers used
//! for drift correction.

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::emitter::{deposit_signatures, signatures_for};
use crate::hardware::{require, ConfigError};
use crate::optics::{PixelSignature, PointSpreadFunction, Position};

pub trait Obstructor: Send + fmt::Debug {
    /// Add this obstructor's photons to the frame accumulator
    fn apply_to(&self, accumulator: &mut Array2<f64>);

    /// Called when the optical configuration changes
    fn refocus(&mut self, _psf: &dyn PointSpreadFunction) {}
}

/// One fiducial bead
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fiducial {
    pub position: Position,
    /// Mean photons per frame
    pub photons: f64,
}

/// Set of always-on point sources rendered through the microscope PSF
#[derive(Debug, Clone)]
pub struct Fiducials {
    beads: Vec<Fiducial>,
    signatures: Vec<Vec<PixelSignature>>,
}

impl Fiducials {
    pub fn new(beads: Vec<Fiducial>, psf: &dyn PointSpreadFunction) -> Self {
        let signatures = beads
            .iter()
            .map(|bead| signatures_for(psf, &bead.position))
            .collect();
        Self { beads, signatures }
    }

    pub fn beads(&self) -> &[Fiducial] {
        &self.beads
    }
}

impl Obstructor for Fiducials {
    fn apply_to(&self, accumulator: &mut Array2<f64>) {
        for (bead, signatures) in self.beads.iter().zip(&self.signatures) {
            deposit_signatures(signatures, bead.photons, accumulator);
        }
    }

    fn refocus(&mut self, psf: &dyn PointSpreadFunction) {
        self.signatures = self
            .beads
            .iter()
            .map(|bead| signatures_for(psf, &bead.position))
            .collect();
    }
}

/// Serializable description of an obstructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ObstructorConfig {
    Fiducials { beads: Vec<Fiducial> },
}

impl ObstructorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ObstructorConfig::Fiducials { beads } => {
                for bead in beads {
                    let p = bead.position;
                    if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
                        return Err(ConfigError::Invalid {
                            component: "fiducials",
                            message: format!("non-finite bead position {p:?}"),
                        });
                    }
                    require(
                        bead.photons.is_finite() && bead.photons >= 0.0,
                        "fiducials",
                        "photons",
                        "finite and non-negative",
                        bead.photons,
                    )?;
                }
            }
        }
        Ok(())
    }

    pub fn build(&self, psf: &dyn PointSpreadFunction) -> Box<dyn Obstructor> {
        match self {
            ObstructorConfig::Fiducials { beads } => Box::new(Fiducials::new(beads.clone(), psf)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optics::{Gaussian2D, Gaussian3D};
    use approx::assert_relative_eq;

    #[test]
    fn test_fiducials_deposit_every_frame() {
        let psf = Gaussian2D::new(1.0).unwrap().with_cutoff(6.0).unwrap();
        let fiducials = Fiducials::new(
            vec![
                Fiducial {
                    position: Position::planar(8.0, 8.0),
                    photons: 500.0,
                },
                Fiducial {
                    position: Position::planar(20.0, 4.0),
                    photons: 100.0,
                },
            ],
            &psf,
        );
        let mut accumulator = Array2::zeros((16, 32));
        fiducials.apply_to(&mut accumulator);
        assert_relative_eq!(accumulator.sum(), 600.0, epsilon = 0.1);
        fiducials.apply_to(&mut accumulator);
        assert_relative_eq!(accumulator.sum(), 1200.0, epsilon = 0.2);
    }

    #[test]
    fn test_refocus_changes_footprint() {
        let bead = Fiducial {
            position: Position::new(10.0, 10.0, 0.0),
            photons: 100.0,
        };
        let focused = Gaussian3D::new(1.0, 0.5, 0.0).unwrap();
        let mut fiducials = Fiducials::new(vec![bead], &focused);
        let mut sharp = Array2::zeros((21, 21));
        fiducials.apply_to(&mut sharp);

        let defocused = Gaussian3D::new(1.0, 0.5, 1.0).unwrap();
        fiducials.refocus(&defocused);
        let mut blurred = Array2::zeros((21, 21));
        fiducials.apply_to(&mut blurred);

        assert!(blurred[[10, 10]] < sharp[[10, 10]]);
    }

    #[test]
    fn test_config_builds_fiducials() {
        let psf = Gaussian2D::new(1.0).unwrap();
        let config = ObstructorConfig::Fiducials {
            beads: vec![Fiducial {
                position: Position::planar(2.0, 2.0),
                photons: 10.0,
            }],
        };
        assert!(config.validate().is_ok());
        let obstructor = config.build(&psf);
        let mut accumulator = Array2::zeros((5, 5));
        obstructor.apply_to(&mut accumulator);
        assert!(accumulator[[2, 2]] > 0.0);
    }

    #[test]
    fn test_rejects_bad_beads() {
        let config = |position, photons| ObstructorConfig::Fiducials {
            beads: vec![Fiducial { position, photons }],
        };
        assert!(matches!(
            config(Position::planar(1.0, 1.0), -5000.0).validate(),
            Err(ConfigError::OutOfRange {
                field: "photons",
                ..
            })
        ));
        assert!(config(Position::planar(1.0, 1.0), f64::NAN)
            .validate()
            .is_err());
        assert!(matches!(
            config(Position::planar(f64::INFINITY, 1.0), 10.0).validate(),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(config(Position::planar(1.0, 1.0), 0.0).validate().is_ok());
    }
}
