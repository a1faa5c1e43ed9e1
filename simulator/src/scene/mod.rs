//! Scene content: emitters, their placement, static obstructors and
//! background light

pub mod background;
pub mod emitter;
pub mod layout;
pub mod obstructor;

pub use background::{
    ArrayBackground, BackgroundConfig, BackgroundGenerator, GradientBackground, UniformBackground,
};
pub use emitter::{Emitter, EmitterSnapshot};
pub use layout::EmitterLayout;
pub use obstructor::{Fiducial, Fiducials, Obstructor, ObstructorConfig};
