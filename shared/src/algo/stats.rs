//! Error-function helpers for PSF integration and statistical checks

use statrs::function::erf::erf;
use std::f64::consts::SQRT_2;

/// Cumulative distribution function for standard normal distribution
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / SQRT_2))
}

/// Fraction of a 1D Gaussian landing in a unit-wide pixel.
///
/// The pixel spans `[offset - 0.5, offset + 0.5]` relative to the Gaussian
/// centre. With `d = sigma * sqrt(2)` this is
/// `0.5 * (erf((offset + 0.5) / d) - erf((offset - 0.5) / d))`.
///
/// A 2D separable Gaussian integrates over a pixel as the product of the two
/// axis integrals.
pub fn gaussian_pixel_integral(offset: f64, sigma: f64) -> f64 {
    let d = sigma * SQRT_2;
    0.5 * (erf((offset + 0.5) / d) - erf((offset - 0.5) / d))
}

/// Flux a 2D Gaussian loses outside a continuous circle of `n_sigma`
/// standard deviations.
///
/// A pixel grid cut at the same radius loses a slightly different amount, so
/// treat this as an estimate for pixelised truncation, not a bound.
///
/// For a circularly symmetric Gaussian the enclosed fraction within radius
/// `n·σ` is `1 - exp(-n²/2)`.
pub fn gaussian_truncation_loss(n_sigma: f64) -> f64 {
    (-0.5 * n_sigma * n_sigma).exp()
}
