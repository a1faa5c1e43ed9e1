//! Noise generation utilities for camera simulation.
//!
//! Array-level random stages used by the sensor noise pipeline:
//! - Poisson shot noise on a mean electron image
//! - Gamma-distributed electron-multiplying gain
//! - Additive zero-mean Gaussian noise (readout, thermal)
//!
//! Every stage takes an explicit seed and runs through
//! [`process_array_in_parallel_chunks`], so the result is reproducible for a
//! given seed. Stages modify the image in place.

use crate::algo::process_array_in_parallel_chunks;
use ndarray::Array2;
use rand::Rng;
use rand_distr::{Distribution, Gamma, Normal, Poisson};

/// Draw one Poisson count with the given mean.
///
/// Non-positive or non-finite means yield zero counts.
pub fn sample_poisson<R: Rng + ?Sized>(mean: f64, rng: &mut R) -> f64 {
    if !(mean > 0.0) || !mean.is_finite() {
        return 0.0;
    }
    match Poisson::new(mean) {
        Ok(poisson) => poisson.sample(rng),
        Err(_) => 0.0,
    }
}

/// Replace every pixel value `λ` with a draw from `Poisson(λ)`.
pub fn apply_poisson_noise(image: &mut Array2<f64>, seed: u64) {
    process_array_in_parallel_chunks(image, seed, None, |chunk, rng| {
        chunk.iter_mut().for_each(|pixel| {
            *pixel = sample_poisson(*pixel, rng);
        });
    });
}

/// Apply electron-multiplying gain as a Gamma draw per pixel.
///
/// Each pixel holding `v > 0` electrons becomes a draw from
/// `Gamma(shape = v + shape_offset, scale = gain)`, whose mean is
/// `(v + shape_offset) * gain`. Pixels with no electrons stay at zero.
/// A non-positive gain leaves the image untouched.
pub fn apply_gamma_gain(image: &mut Array2<f64>, gain: f64, shape_offset: f64, seed: u64) {
    if !(gain > 0.0) {
        return;
    }
    process_array_in_parallel_chunks(image, seed, None, |chunk, rng| {
        chunk.iter_mut().for_each(|pixel| {
            if *pixel <= 0.0 {
                *pixel = 0.0;
                return;
            }
            *pixel = match Gamma::new(*pixel + shape_offset, gain) {
                Ok(gamma) => gamma.sample(rng),
                Err(_) => *pixel * gain,
            };
        });
    });
}

/// Add independent zero-mean Gaussian noise with standard deviation `std_dev`
/// to every pixel. A non-positive deviation is a no-op.
pub fn add_gaussian_noise(image: &mut Array2<f64>, std_dev: f64, seed: u64) {
    if !(std_dev > 0.0) {
        return;
    }
    let normal = match Normal::new(0.0, std_dev) {
        Ok(normal) => normal,
        Err(_) => return,
    };
    process_array_in_parallel_chunks(image, seed, None, move |chunk, rng| {
        chunk.iter_mut().for_each(|pixel| {
            *pixel += normal.sample(rng);
        });
    });
}
