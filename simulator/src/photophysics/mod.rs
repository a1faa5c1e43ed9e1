//! Photophysical state dynamics of fluorescent emitters

pub mod presets;
pub mod rate;
pub mod state_system;

pub use presets::{Fluorophore, PalmRates};
pub use rate::RateModel;
pub use state_system::{
    RateTable, StateAdvance, StateId, StateSpec, StateSystem, StateSystemError, Transition,
};
