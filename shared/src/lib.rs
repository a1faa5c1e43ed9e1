//! Shared components for the SMLM frame simulator.
//!
//! This crate holds the numeric pieces that have no knowledge of microscopes,
//! fluorophores or cameras: seeded parallel array processing, error-function
//! helpers, array-level noise stages and the frame containers produced by the
//! simulator.

pub mod algo;
pub mod frame;
pub mod image_proc;
pub mod image_size;

pub use frame::{Frame, FrameError, FrameStack};
pub use image_size::PixelShape;
