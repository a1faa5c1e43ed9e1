//! Noise processing for camera simulation
//!
//! - **generate**: seeded array-level noise stages (shot, EM gain, Gaussian)

pub mod generate;

pub use generate::{add_gaussian_noise, apply_gamma_gain, apply_poisson_noise, sample_poisson};
