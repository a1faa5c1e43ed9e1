//! Image processing primitives used by the frame simulator.
//!
//! Only the sensor-side pieces live here: the seeded noise stages applied to
//! a photon/electron image before digitization.

pub mod noise;

pub use noise::{add_gaussian_noise, apply_gamma_gain, apply_poisson_noise, sample_poisson};
