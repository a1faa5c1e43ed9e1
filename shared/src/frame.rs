//! Frames produced by the simulator and the append-only stack that holds them.

use crate::image_size::PixelShape;
use ndarray::{Array2, Array3, ArrayView2, Axis};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame resolution {found} does not match stack resolution {expected}")]
    DimensionMismatch {
        expected: PixelShape,
        found: PixelShape,
    },
    #[error("Frame stack is empty")]
    Empty,
}

/// One digitized camera frame.
///
/// Pixel values are in ADU and indexed `[[y, x]]`. A frame is never modified
/// after the simulator returns it.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    frame_number: u64,
    pixels: Array2<u16>,
}

impl Frame {
    pub fn new(frame_number: u64, pixels: Array2<u16>) -> Self {
        Self {
            frame_number,
            pixels,
        }
    }

    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    pub fn resolution(&self) -> PixelShape {
        PixelShape::from_array_dim(self.pixels.dim())
    }

    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    pub fn pixels(&self) -> ArrayView2<'_, u16> {
        self.pixels.view()
    }

    /// Pixel value at `(x, y)`, or `None` outside the frame
    pub fn get(&self, x: usize, y: usize) -> Option<u16> {
        self.pixels.get([y, x]).copied()
    }

    pub fn into_pixels(self) -> Array2<u16> {
        self.pixels
    }

    /// Sum of all pixel values
    pub fn total(&self) -> u64 {
        self.pixels.iter().map(|&v| v as u64).sum()
    }
}

/// Append-only sequence of equally sized frames.
#[derive(Debug, Clone, Default)]
pub struct FrameStack {
    resolution: Option<PixelShape>,
    frames: Vec<Frame>,
}

impl FrameStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame; the first frame fixes the stack resolution.
    pub fn push(&mut self, frame: Frame) -> Result<(), FrameError> {
        let found = frame.resolution();
        match self.resolution {
            Some(expected) if expected != found => {
                return Err(FrameError::DimensionMismatch { expected, found })
            }
            Some(_) => {}
            None => self.resolution = Some(found),
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Append every frame of `other`. Nothing is appended on mismatch.
    pub fn concatenate(&mut self, other: FrameStack) -> Result<(), FrameError> {
        if let (Some(expected), Some(found)) = (self.resolution, other.resolution) {
            if expected != found {
                return Err(FrameError::DimensionMismatch { expected, found });
            }
        }
        if self.resolution.is_none() {
            self.resolution = other.resolution;
        }
        self.frames.extend(other.frames);
        Ok(())
    }

    pub fn resolution(&self) -> Option<PixelShape> {
        self.resolution
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn last(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    /// Stack all frames into a `(frames, height, width)` cube.
    pub fn to_array3(&self) -> Result<Array3<u16>, FrameError> {
        if self.frames.is_empty() {
            return Err(FrameError::Empty);
        }
        let views: Vec<ArrayView2<u16>> = self.frames.iter().map(|f| f.pixels()).collect();
        ndarray::stack(Axis(0), &views).map_err(|_| FrameError::Empty)
    }
}
