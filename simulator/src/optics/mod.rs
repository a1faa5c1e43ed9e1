//! Optical models mapping emitters onto the camera pixel grid

pub mod psf;

pub use psf::{
    Gaussian2D, Gaussian3D, PixelSignature, PointSpreadFunction, Position, PsfConfig, PsfError,
};
