//! Algorithms shared across the simulator
//!
//! - **parallel**: seeded, deterministic row-chunk processing of 2D arrays
//! - **stats**: error-function helpers used by PSF integration and tests

pub mod parallel;
pub mod stats;

pub use parallel::{chunk_seed, process_array_in_parallel_chunks};
pub use stats::{gaussian_pixel_integral, gaussian_truncation_loss, normal_cdf};
