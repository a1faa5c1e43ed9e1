//! Sensor noise pipeline
//!
//! Converts a noiseless photon image into camera counts. Stages run in a
//! fixed order:
//!
//! 1. background photons are added
//! 2. photons become photo-electrons (quantum efficiency) and mean dark
//!    current is added
//! 3. shot noise, `Poisson(λ)` per pixel
//! 4. electron-multiplying gain, `Gamma(v + ε, gain)`, skipped when the
//!    camera has no EM stage
//! 5. readout and thermal noise as one zero-mean Gaussian
//! 6. digitization
//!
//! Every random stage takes its own seed from the caller's generator, so a
//! frame is reproducible from the instance seed alone.

use ndarray::Array2;
use rand::RngCore;
use shared::image_proc::{add_gaussian_noise, apply_gamma_gain, apply_poisson_noise};

use super::render::digitize;
use crate::hardware::Camera;

/// Shape offset added to the electron count before the Gamma draw, so the
/// distribution stays defined for single electrons.
pub const GAMMA_SHAPE_OFFSET: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq)]
pub struct NoisePipeline {
    camera: Camera,
    gain_shape_offset: f64,
}

impl NoisePipeline {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            gain_shape_offset: GAMMA_SHAPE_OFFSET,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mean photo-electrons for a photon image, before any noise is drawn
    pub fn expected_electrons(&self, photons: &Array2<f64>) -> Array2<f64> {
        let qe = self.camera.quantum_efficiency;
        let dark = self.camera.dark_current_e;
        photons.mapv(|p| p.max(0.0) * qe + dark)
    }

    /// Run every stage on `photons` and return the digitized frame.
    ///
    /// `background` must have the same shape as `photons`; the caller checks
    /// it.
    pub fn apply<R: RngCore + ?Sized>(
        &self,
        mut photons: Array2<f64>,
        background: Option<&Array2<f64>>,
        rng: &mut R,
    ) -> Array2<u16> {
        if let Some(background) = background {
            photons += background;
        }

        let mut electrons = self.expected_electrons(&photons);

        apply_poisson_noise(&mut electrons, rng.next_u64());

        let gain_seed = rng.next_u64();
        if self.camera.has_em_gain() {
            apply_gamma_gain(
                &mut electrons,
                self.camera.em_gain,
                self.gain_shape_offset,
                gain_seed,
            );
        }

        add_gaussian_noise(&mut electrons, self.camera.additive_noise_e(), rng.next_u64());

        digitize(&electrons, &self.camera)
    }
}
