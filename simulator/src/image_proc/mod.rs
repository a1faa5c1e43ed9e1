//! Sensor-side image processing: the noise pipeline and digitization.
//!
//! The array-level random stages live in `shared::image_proc`; this module
//! composes them with the camera configuration.

pub mod noise;
pub mod render;

pub use noise::NoisePipeline;
pub use render::digitize;
