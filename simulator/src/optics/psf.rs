//! Point spread functions and per-pixel photon signatures
//!
//! A PSF answers one question: what fraction of an emitter's photons lands on
//! a given camera pixel. Pixel `(i, j)` covers `[i - 0.5, i + 0.5] × [j - 0.5,
//! j + 0.5]` in pixel coordinates, so the pixel containing a point is found
//! by rounding.

use std::fmt;

use serde::{Deserialize, Serialize};
use shared::algo::{gaussian_pixel_integral, gaussian_truncation_loss};
use thiserror::Error;

use crate::hardware::{Camera, Objective, Stage};

/// Ratio between the FWHM and the standard deviation of a Gaussian
pub const FWHM_TO_SIGMA: f64 = 2.354_820_045_030_949;

/// Default truncation radius in standard deviations
pub const DEFAULT_CUTOFF_SIGMAS: f64 = 3.0;

/// Largest coordinate or PSF radius, in pixels, that still resolves whole
/// pixels (2^52). Emitters beyond it, or spread wider than it, have no
/// signature.
pub const MAX_COORDINATE_PX: f64 = 4_503_599_627_370_496.0;

/// Cap on the signature list preallocation
const MAX_PREALLOCATED_SIGNATURES: usize = 1 << 16;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PsfError {
    #[error("PSF width must be finite and positive, got sigma = {0} px")]
    InvalidWidth(f64),
    #[error("PSF cutoff must be finite and positive, got {0} sigma")]
    InvalidCutoff(f64),
    #[error("Depth of field must be finite and positive, got {0} um")]
    InvalidDepthOfField(f64),
}

/// Emitter position. `x` and `y` are in camera pixels, `z` in microns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// In-plane position, `z = 0`
    pub fn planar(x: f64, y: f64) -> Self {
        Self::new(x, y, 0.0)
    }

    /// Integer pixel containing this position
    pub fn pixel(&self) -> (i64, i64) {
        (self.x.round() as i64, self.y.round() as i64)
    }
}

/// Share of an emitter's photons received by pixel `(x, y)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelSignature {
    pub x: i64,
    pub y: i64,
    pub fraction: f64,
}

pub trait PointSpreadFunction: Send + Sync + fmt::Debug {
    /// Fraction of the photons from `position` integrated over pixel `(px, py)`
    fn signature(&self, position: &Position, px: i64, py: i64) -> f64;

    /// Distance in pixels beyond which the signature is treated as zero
    fn radius(&self, position: &Position) -> f64;

    /// True if the signatures change when the focal plane moves
    fn depends_on_stage_z(&self) -> bool {
        false
    }

    /// Pixels within [`PointSpreadFunction::radius`] of `position`, with their
    /// signatures.
    ///
    /// Pixels are taken from the bounding square and kept when their centre
    /// lies within the radius. A radius below one pixel yields only the pixel
    /// containing the point, with a signature of 0; the caller decides what
    /// that pixel receives. Positions or radii beyond [`MAX_COORDINATE_PX`]
    /// yield no pixels.
    fn pixel_signatures(&self, position: &Position) -> Vec<PixelSignature> {
        if !(position.x.abs() <= MAX_COORDINATE_PX && position.y.abs() <= MAX_COORDINATE_PX) {
            return Vec::new();
        }
        let (cx, cy) = position.pixel();
        let radius = self.radius(position);
        if !(radius >= 1.0) {
            return vec![PixelSignature {
                x: cx,
                y: cy,
                fraction: 0.0,
            }];
        }
        if radius > MAX_COORDINATE_PX {
            return Vec::new();
        }

        // |c| + reach <= 2^53, far from i64 overflow
        let reach = radius.ceil() as i64;
        let side = (2 * reach + 1) as usize;
        let mut signatures =
            Vec::with_capacity(side.saturating_mul(side).min(MAX_PREALLOCATED_SIGNATURES));
        for py in (cy - reach)..=(cy + reach) {
            for px in (cx - reach)..=(cx + reach) {
                let dx = px as f64 - position.x;
                let dy = py as f64 - position.y;
                if dx.hypot(dy) > radius {
                    continue;
                }
                signatures.push(PixelSignature {
                    x: px,
                    y: py,
                    fraction: self.signature(position, px, py),
                });
            }
        }
        signatures
    }
}

fn check_width(sigma_px: f64) -> Result<(), PsfError> {
    if sigma_px.is_finite() && sigma_px > 0.0 {
        Ok(())
    } else {
        Err(PsfError::InvalidWidth(sigma_px))
    }
}

fn check_cutoff(cutoff_sigmas: f64) -> Result<(), PsfError> {
    if cutoff_sigmas.is_finite() && cutoff_sigmas > 0.0 {
        Ok(())
    } else {
        Err(PsfError::InvalidCutoff(cutoff_sigmas))
    }
}

fn separable_gaussian(position: &Position, px: i64, py: i64, sigma: f64) -> f64 {
    gaussian_pixel_integral(px as f64 - position.x, sigma)
        * gaussian_pixel_integral(py as f64 - position.y, sigma)
}

/// In-focus symmetric Gaussian approximation of the Airy pattern.
///
/// Truncating at `n` standard deviations drops roughly `exp(-n² / 2)` of the
/// flux, about 1.1% at the default of 3σ. That is the loss outside a
/// continuous disc; keeping whole pixels by their centres can lose slightly
/// more (about 1.2% at σ = 2 px, 1.6% at σ = 1 px).
#[derive(Debug, Clone, PartialEq)]
pub struct Gaussian2D {
    sigma_px: f64,
    cutoff_sigmas: f64,
}

impl Gaussian2D {
    pub fn new(sigma_px: f64) -> Result<Self, PsfError> {
        check_width(sigma_px)?;
        Ok(Self {
            sigma_px,
            cutoff_sigmas: DEFAULT_CUTOFF_SIGMAS,
        })
    }

    pub fn from_fwhm(fwhm_px: f64) -> Result<Self, PsfError> {
        Self::new(fwhm_px / FWHM_TO_SIGMA)
    }

    /// Width from the diffraction limit of `objective` at `wavelength_nm`
    pub fn from_optics(
        camera: &Camera,
        objective: &Objective,
        wavelength_nm: f64,
    ) -> Result<Self, PsfError> {
        Self::from_fwhm(objective.fwhm_pixels(wavelength_nm, camera.pixel_size_um))
    }

    pub fn with_cutoff(mut self, cutoff_sigmas: f64) -> Result<Self, PsfError> {
        check_cutoff(cutoff_sigmas)?;
        self.cutoff_sigmas = cutoff_sigmas;
        Ok(self)
    }

    pub fn sigma_px(&self) -> f64 {
        self.sigma_px
    }

    pub fn cutoff_sigmas(&self) -> f64 {
        self.cutoff_sigmas
    }

    /// Flux lost outside the continuous cutoff disc. The kept pixel set can
    /// lose somewhat more; see the type docs.
    pub fn truncation_loss(&self) -> f64 {
        gaussian_truncation_loss(self.cutoff_sigmas)
    }
}

impl PointSpreadFunction for Gaussian2D {
    fn signature(&self, position: &Position, px: i64, py: i64) -> f64 {
        separable_gaussian(position, px, py, self.sigma_px)
    }

    fn radius(&self, _position: &Position) -> f64 {
        self.cutoff_sigmas * self.sigma_px
    }
}

/// Gaussian whose width grows with distance from the focal plane,
/// `σ(z) = σ₀ · sqrt(1 + ((z - focus) / depth_of_field)²)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Gaussian3D {
    sigma0_px: f64,
    depth_of_field_um: f64,
    focus_z_um: f64,
    cutoff_sigmas: f64,
}

impl Gaussian3D {
    pub fn new(sigma0_px: f64, depth_of_field_um: f64, focus_z_um: f64) -> Result<Self, PsfError> {
        check_width(sigma0_px)?;
        if !(depth_of_field_um.is_finite() && depth_of_field_um > 0.0) {
            return Err(PsfError::InvalidDepthOfField(depth_of_field_um));
        }
        Ok(Self {
            sigma0_px,
            depth_of_field_um,
            focus_z_um,
            cutoff_sigmas: DEFAULT_CUTOFF_SIGMAS,
        })
    }

    pub fn with_cutoff(mut self, cutoff_sigmas: f64) -> Result<Self, PsfError> {
        check_cutoff(cutoff_sigmas)?;
        self.cutoff_sigmas = cutoff_sigmas;
        Ok(self)
    }

    pub fn focus_z_um(&self) -> f64 {
        self.focus_z_um
    }

    /// Width in pixels at depth `z_um`
    pub fn sigma_at(&self, z_um: f64) -> f64 {
        let defocus = (z_um - self.focus_z_um) / self.depth_of_field_um;
        self.sigma0_px * (1.0 + defocus * defocus).sqrt()
    }
}

impl PointSpreadFunction for Gaussian3D {
    fn signature(&self, position: &Position, px: i64, py: i64) -> f64 {
        separable_gaussian(position, px, py, self.sigma_at(position.z))
    }

    fn radius(&self, position: &Position) -> f64 {
        self.cutoff_sigmas * self.sigma_at(position.z)
    }

    fn depends_on_stage_z(&self) -> bool {
        true
    }
}

/// Which PSF model a microscope renders with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PsfConfig {
    Gaussian2D {
        cutoff_sigmas: f64,
    },
    Gaussian3D {
        cutoff_sigmas: f64,
        depth_of_field_um: f64,
    },
}

impl Default for PsfConfig {
    fn default() -> Self {
        PsfConfig::Gaussian2D {
            cutoff_sigmas: DEFAULT_CUTOFF_SIGMAS,
        }
    }
}

impl PsfConfig {
    /// Build the PSF for the current optical setup.
    ///
    /// The in-focus width is the diffraction limit of `objective` at the
    /// fluorophore's emission wavelength. The 3D model focuses at the stage z.
    pub fn build(
        &self,
        camera: &Camera,
        objective: &Objective,
        stage: &Stage,
        wavelength_nm: f64,
    ) -> Result<Box<dyn PointSpreadFunction>, PsfError> {
        let in_focus = Gaussian2D::from_optics(camera, objective, wavelength_nm)?;
        match *self {
            PsfConfig::Gaussian2D { cutoff_sigmas } => {
                Ok(Box::new(in_focus.with_cutoff(cutoff_sigmas)?))
            }
            PsfConfig::Gaussian3D {
                cutoff_sigmas,
                depth_of_field_um,
            } => Ok(Box::new(
                Gaussian3D::new(in_focus.sigma_px(), depth_of_field_um, stage.z_um)?
                    .with_cutoff(cutoff_sigmas)?,
            )),
        }
    }

    pub fn depends_on_stage_z(&self) -> bool {
        matches!(self, PsfConfig::Gaussian3D { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::models::{EMCCD_512, OIL_100X_1_49};
    use approx::assert_relative_eq;

    fn total(signatures: &[PixelSignature]) -> f64 {
        signatures.iter().map(|s| s.fraction).sum()
    }

    #[test]
    fn test_signatures_sum_to_one_without_truncation() {
        for (x, y, sigma) in [(10.0, 10.0, 1.3), (20.37, 5.81, 2.0), (7.5, 7.5, 1.0)] {
            let psf = Gaussian2D::new(sigma).unwrap().with_cutoff(8.0).unwrap();
            let sum = total(&psf.pixel_signatures(&Position::planar(x, y)));
            assert!((sum - 1.0).abs() < 1e-3, "sum {sum} for sigma {sigma}");
        }
    }

    #[test]
    fn test_sums_shrink_with_cutoff() {
        let position = Position::planar(32.2, 31.7);
        let mut previous = f64::INFINITY;
        for cutoff in [6.0, 4.0, 3.0, 2.0, 1.5, 1.0] {
            let psf = Gaussian2D::new(1.5).unwrap().with_cutoff(cutoff).unwrap();
            let sum = total(&psf.pixel_signatures(&position));
            assert!(sum <= previous, "cutoff {cutoff}: {sum} > {previous}");
            previous = sum;
        }
    }

    #[test]
    fn test_truncation_loss_approximates_pixel_loss() {
        let psf = Gaussian2D::new(2.0).unwrap();
        let sum = total(&psf.pixel_signatures(&Position::planar(50.0, 50.0)));
        // Centre-in-disc pixels lose 1.24% against 1.11% for the disc
        assert!(1.0 - sum > psf.truncation_loss());
        assert_relative_eq!(1.0 - sum, psf.truncation_loss(), max_relative = 0.15);
    }

    #[test]
    fn test_true_radius_filter() {
        let psf = Gaussian2D::new(1.0).unwrap();
        let position = Position::planar(10.0, 10.0);
        let signatures = psf.pixel_signatures(&position);
        // Corners of the 7x7 bounding square lie outside 3 px.
        assert!(signatures.len() < 49);
        assert!(signatures.iter().all(|s| {
            ((s.x as f64 - position.x).powi(2) + (s.y as f64 - position.y).powi(2)).sqrt() <= 3.0
        }));
        assert!(signatures.iter().any(|s| s.x == 13 && s.y == 10));
        assert!(!signatures.iter().any(|s| s.x == 13 && s.y == 13));
    }

    #[test]
    fn test_brightest_pixel_contains_emitter() {
        let psf = Gaussian2D::new(1.2).unwrap();
        let position = Position::planar(4.4, 9.6);
        let brightest = psf
            .pixel_signatures(&position)
            .into_iter()
            .max_by(|a, b| a.fraction.total_cmp(&b.fraction))
            .unwrap();
        assert_eq!((brightest.x, brightest.y), (4, 10));
    }

    #[test]
    fn test_sub_pixel_radius_is_single_pixel() {
        let psf = Gaussian2D::new(0.2).unwrap();
        let signatures = psf.pixel_signatures(&Position::planar(3.6, 8.2));
        assert_eq!(
            signatures,
            vec![PixelSignature {
                x: 4,
                y: 8,
                fraction: 0.0
            }]
        );
    }

    #[test]
    fn test_far_off_positions_have_no_pixels() {
        let psf = Gaussian2D::new(1.0).unwrap();
        for position in [
            Position::planar(1e19, 5.0),
            Position::planar(5.0, -1e300),
            Position::planar(f64::NAN, 5.0),
            Position::planar(f64::INFINITY, 5.0),
        ] {
            assert!(psf.pixel_signatures(&position).is_empty());
        }

        // Still representable: enumerated normally, far from any sensor
        let edge = Position::planar(MAX_COORDINATE_PX, 0.0);
        let signatures = psf.pixel_signatures(&edge);
        assert!(!signatures.is_empty());
        assert!((total(&signatures) - 1.0).abs() < 0.02);
    }

    #[test]
    fn test_unbounded_defocus_has_no_pixels() {
        let psf = Gaussian3D::new(1.0, 1e-300, 0.0).unwrap();
        assert!(psf
            .pixel_signatures(&Position::new(3.0, 3.0, 1.0))
            .is_empty());
    }

    #[test]
    fn test_defocus_widens_3d_psf() {
        let psf = Gaussian3D::new(1.0, 0.5, 0.0).unwrap();
        assert_relative_eq!(psf.sigma_at(0.0), 1.0);
        assert_relative_eq!(psf.sigma_at(0.5), 2f64.sqrt());
        assert_relative_eq!(psf.sigma_at(-0.5), 2f64.sqrt());

        let in_focus = psf.pixel_signatures(&Position::new(10.0, 10.0, 0.0));
        let defocused = psf.pixel_signatures(&Position::new(10.0, 10.0, 1.0));
        assert!(defocused.len() > in_focus.len());
        let peak = |s: &[PixelSignature]| s.iter().map(|p| p.fraction).fold(0.0, f64::max);
        assert!(peak(&defocused) < peak(&in_focus));
    }

    #[test]
    fn test_3d_in_focus_matches_2d() {
        let flat = Gaussian2D::new(1.4).unwrap();
        let deep = Gaussian3D::new(1.4, 0.4, 0.25).unwrap();
        let position = Position::new(5.3, 6.1, 0.25);
        assert_eq!(
            flat.pixel_signatures(&position),
            deep.pixel_signatures(&position)
        );
        assert!(deep.depends_on_stage_z());
        assert!(!flat.depends_on_stage_z());
    }

    #[test]
    fn test_build_from_optics() {
        let stage = Stage::default();
        let psf = PsfConfig::default()
            .build(&EMCCD_512, &OIL_100X_1_49, &stage, 647.0)
            .unwrap();
        let fwhm = OIL_100X_1_49.fwhm_pixels(647.0, EMCCD_512.pixel_size_um);
        assert_relative_eq!(
            psf.radius(&Position::default()),
            3.0 * fwhm / FWHM_TO_SIGMA,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert_eq!(Gaussian2D::new(0.0), Err(PsfError::InvalidWidth(0.0)));
        assert!(Gaussian2D::new(f64::NAN).is_err());
        assert_eq!(
            Gaussian2D::new(1.0).unwrap().with_cutoff(-1.0),
            Err(PsfError::InvalidCutoff(-1.0))
        );
        assert_eq!(
            Gaussian3D::new(1.0, 0.0, 0.0),
            Err(PsfError::InvalidDepthOfField(0.0))
        );
    }
}
