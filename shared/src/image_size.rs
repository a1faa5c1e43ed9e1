//! Image dimensions and pixel-bounds utilities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Image dimensions of a camera sensor or frame.
///
/// Arrays built from a `PixelShape` are indexed `[[y, x]]`, so
/// [`PixelShape::array_dim`] returns `(height, width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelShape {
    /// Image width in pixels
    pub width: usize,
    /// Image height in pixels
    pub height: usize,
}

impl PixelShape {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Get total number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// ndarray dimension tuple `(rows, cols)`
    pub fn array_dim(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Shape of an ndarray dimension tuple `(rows, cols)`
    pub fn from_array_dim(dim: (usize, usize)) -> Self {
        Self::new(dim.1, dim.0)
    }

    /// Check if a signed pixel coordinate falls on the sensor
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as u64) < self.width as u64 && (y as u64) < self.height as u64
    }

    /// Array index `[[row, col]]` for a signed pixel coordinate, or `None`
    /// if it lies off the sensor.
    pub fn index_of(&self, x: i64, y: i64) -> Option<[usize; 2]> {
        if self.contains(x, y) {
            Some([y as usize, x as usize])
        } else {
            None
        }
    }

    /// Get center point as (x, y) float coordinates
    pub fn center(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }
}

impl From<(usize, usize)> for PixelShape {
    fn from(dimensions: (usize, usize)) -> Self {
        Self::new(dimensions.0, dimensions.1)
    }
}

impl fmt::Display for PixelShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
