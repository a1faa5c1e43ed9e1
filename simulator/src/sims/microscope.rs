//! Frame-by-frame microscope simulation
//!
//! A [`Microscope`] owns one emitter population and renders it through the
//! PSF and the camera noise pipeline. Each call to
//! [`Microscope::simulate_frame`] advances every emitter by one frame and
//! returns a fresh frame.

use std::fmt;
use std::sync::Arc;

use log::{debug, trace, warn};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use shared::{Frame, PixelShape};

use crate::error::{Result, SimulationError};
use crate::events::{EmissionEvent, EventListener, TransitionEvent};
use crate::hardware::{require, Camera, Laser, Objective, Stage};
use crate::image_proc::NoisePipeline;
use crate::optics::{PointSpreadFunction, PsfConfig};
use crate::photophysics::{Fluorophore, StateSystem};
use crate::scene::background::check_shape;
use crate::scene::{
    BackgroundConfig, BackgroundGenerator, Emitter, EmitterLayout, EmitterSnapshot, Obstructor,
    ObstructorConfig,
};

fn default_frame_duration() -> f64 {
    1.0
}

/// Everything needed to build a [`Microscope`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroscopeConfig {
    pub camera: Camera,
    pub laser: Laser,
    pub objective: Objective,
    #[serde(default)]
    pub stage: Stage,
    pub fluorophore: Fluorophore,
    #[serde(default)]
    pub layout: EmitterLayout,
    #[serde(default)]
    pub psf: PsfConfig,
    #[serde(default)]
    pub background: BackgroundConfig,
    #[serde(default)]
    pub obstructors: Vec<ObstructorConfig>,
    /// Seed of the instance random generator
    #[serde(default)]
    pub seed: u64,
    /// Frame duration in the time unit the rates are expressed in
    #[serde(default = "default_frame_duration")]
    pub frame_duration: f64,
}

impl MicroscopeConfig {
    /// Configuration with no emitters, no background, a 2D Gaussian PSF and
    /// seed 0.
    pub fn new(camera: Camera, laser: Laser, objective: Objective, fluorophore: Fluorophore) -> Self {
        Self {
            camera,
            laser,
            objective,
            stage: Stage::default(),
            fluorophore,
            layout: EmitterLayout::default(),
            psf: PsfConfig::default(),
            background: BackgroundConfig::None,
            obstructors: Vec::new(),
            seed: 0,
            frame_duration: default_frame_duration(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.camera.validate()?;
        self.laser.validate()?;
        self.objective.validate()?;
        self.stage.validate()?;
        self.layout.validate()?;
        for obstructor in &self.obstructors {
            obstructor.validate()?;
        }

        self.fluorophore.validate()?;
        self.fluorophore
            .system
            .validate_power_range(self.laser.min_power, self.laser.max_power)?;
        require(
            self.fluorophore.signal_per_frame.is_finite() && self.fluorophore.signal_per_frame >= 0.0,
            "fluorophore",
            "signal_per_frame",
            "finite and non-negative",
            self.fluorophore.signal_per_frame,
        )?;
        require(
            self.fluorophore.wavelength_nm.is_finite() && self.fluorophore.wavelength_nm > 0.0,
            "fluorophore",
            "wavelength_nm",
            "positive",
            self.fluorophore.wavelength_nm,
        )?;
        require(
            self.frame_duration.is_finite() && self.frame_duration > 0.0,
            "microscope",
            "frame_duration",
            "positive",
            self.frame_duration,
        )?;
        Ok(())
    }
}

pub struct Microscope {
    config: MicroscopeConfig,
    psf: Box<dyn PointSpreadFunction>,
    emitters: Vec<Emitter>,
    obstructors: Vec<Box<dyn Obstructor>>,
    background: Option<Box<dyn BackgroundGenerator>>,
    noise: NoisePipeline,
    listeners: Vec<Box<dyn EventListener>>,
    rng: StdRng,
    frame_number: u64,
    rate_recomputations: u64,
}

impl fmt::Debug for Microscope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Microscope")
            .field("camera", &self.config.camera.name)
            .field("resolution", &self.config.camera.resolution)
            .field("laser_power", &self.config.laser.power)
            .field("emitters", &self.emitters.len())
            .field("obstructors", &self.obstructors.len())
            .field("listeners", &self.listeners.len())
            .field("frame_number", &self.frame_number)
            .finish_non_exhaustive()
    }
}

impl Microscope {
    /// Validate `config`, place the emitters and build the optics.
    pub fn new(config: MicroscopeConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let resolution = config.camera.resolution;
        let psf = config.psf.build(
            &config.camera,
            &config.objective,
            &config.stage,
            config.fluorophore.wavelength_nm,
        )?;

        let system = Arc::new(config.fluorophore.system.clone());
        let power = config.laser.power;
        let emitters: Vec<Emitter> = config
            .layout
            .positions(resolution, &mut rng)?
            .into_iter()
            .map(|position| {
                Emitter::new(
                    position,
                    Arc::clone(&system),
                    config.fluorophore.initial_state,
                    config.fluorophore.signal_per_frame,
                    power,
                    psf.as_ref(),
                )
            })
            .collect();

        let obstructors = config
            .obstructors
            .iter()
            .map(|o| o.build(psf.as_ref()))
            .collect();
        let background = config.background.build(resolution)?;
        let noise = NoisePipeline::new(config.camera.clone());

        debug!(
            "Microscope: {} '{}' emitters on {} ({}), laser {:.3} in [{}, {}], seed {}",
            emitters.len(),
            config.fluorophore.name,
            config.camera.name,
            resolution,
            power,
            config.laser.min_power,
            config.laser.max_power,
            config.seed
        );

        Ok(Self {
            config,
            psf,
            emitters,
            obstructors,
            background,
            noise,
            listeners: Vec::new(),
            rng,
            frame_number: 0,
            rate_recomputations: 0,
        })
    }

    pub fn add_listener(&mut self, listener: Box<dyn EventListener>) {
        self.listeners.push(listener);
    }

    pub fn add_obstructor(&mut self, obstructor: Box<dyn Obstructor>) {
        self.obstructors.push(obstructor);
    }

    /// Replace the background source; `None` disables background light.
    pub fn set_background(&mut self, background: Option<Box<dyn BackgroundGenerator>>) {
        self.background = background;
    }

    /// Render one frame and advance every emitter by one frame duration.
    ///
    /// Fails only if the background generator returns an image of the wrong
    /// shape, in which case no emitter is advanced.
    pub fn simulate_frame(&mut self) -> Result<Frame> {
        let resolution = self.config.camera.resolution;

        let background = match self.background.as_mut() {
            Some(generator) => {
                let background = generator.generate(resolution);
                check_shape(&background, resolution)?;
                Some(background)
            }
            None => None,
        };

        let mut accumulator = Array2::zeros(resolution.array_dim());
        for obstructor in &self.obstructors {
            obstructor.apply_to(&mut accumulator);
        }
        self.advance_emitters(Some(&mut accumulator));

        let pixels = self
            .noise
            .apply(accumulator, background.as_ref(), &mut self.rng);
        let frame = Frame::new(self.frame_number, pixels);

        trace!(
            "frame {}: {} of {} emitters on, laser {:.3}",
            self.frame_number,
            self.on_emitter_count(),
            self.emitters.len(),
            self.config.laser.power
        );
        self.frame_number += 1;
        Ok(frame)
    }

    /// Advance every emitter by one frame without rendering
    pub fn increment_time_step(&mut self) {
        self.advance_emitters(None);
        trace!(
            "step {}: {} of {} emitters on",
            self.frame_number,
            self.on_emitter_count(),
            self.emitters.len()
        );
        self.frame_number += 1;
    }

    fn advance_emitters(&mut self, mut accumulator: Option<&mut Array2<f64>>) {
        let frame = self.frame_number;
        let duration = self.config.frame_duration;
        let Self {
            emitters,
            listeners,
            rng,
            ..
        } = self;

        for emitter in emitters.iter_mut() {
            let emitter_id = emitter.id();
            let advance = emitter.step(duration, rng, |t| {
                for listener in listeners.iter_mut() {
                    listener.on_transition(&TransitionEvent {
                        frame,
                        emitter_id,
                        from: t.from,
                        to: t.to,
                        time: t.time,
                    });
                }
            });

            let Some(image) = accumulator.as_deref_mut() else {
                continue;
            };
            if advance.on_time <= 0.0 {
                continue;
            }
            let photons = emitter.flicker(advance.on_time, rng);
            emitter.deposit(photons, image);
            for listener in listeners.iter_mut() {
                listener.on_emission(&EmissionEvent {
                    frame,
                    emitter_id,
                    position: emitter.position(),
                    on_time: advance.on_time,
                    photons,
                });
            }
        }
    }

    /// Number of emitters currently in an emitting state
    pub fn on_emitter_count(&self) -> f64 {
        self.emitters.iter().filter(|e| e.is_emitting()).count() as f64
    }

    /// Number of emitters that can no longer change state
    pub fn terminal_emitter_count(&self) -> usize {
        self.emitters.iter().filter(|e| e.is_terminal()).count()
    }

    /// Set the laser power, clamped to the laser's range.
    ///
    /// Emitters whose cached power already equals the applied power keep their
    /// rate tables. Returns the applied power.
    pub fn set_laser_power(&mut self, power: f64) -> Result<f64> {
        if !power.is_finite() {
            return Err(SimulationError::InvalidPower(power));
        }
        let applied = self.config.laser.set_power(power);
        if applied != power {
            warn!(
                "Laser power {} outside [{}, {}], clamped to {}",
                power, self.config.laser.min_power, self.config.laser.max_power, applied
            );
        }

        let mut recomputed = 0;
        for emitter in &mut self.emitters {
            if emitter.update_power(applied) {
                recomputed += 1;
            }
        }
        self.rate_recomputations += recomputed;
        if recomputed > 0 {
            debug!("Laser power {applied}: recomputed rates for {recomputed} emitters");
        }
        Ok(applied)
    }

    pub fn laser_power(&self) -> f64 {
        self.config.laser.power
    }

    /// Total number of per-emitter rate table evaluations caused by power
    /// changes
    pub fn rate_recomputations(&self) -> u64 {
        self.rate_recomputations
    }

    /// Move the focal plane.
    ///
    /// Signatures are recomputed only when the PSF depends on stage z and z
    /// actually changed. Returns whether signatures were recomputed.
    pub fn set_stage_z(&mut self, z_um: f64) -> Result<bool> {
        require(z_um.is_finite(), "stage", "z_um", "finite", z_um)?;
        if self.config.stage.z_um == z_um {
            return Ok(false);
        }
        self.config.stage.z_um = z_um;
        if !self.psf.depends_on_stage_z() {
            return Ok(false);
        }

        self.psf = self.config.psf.build(
            &self.config.camera,
            &self.config.objective,
            &self.config.stage,
            self.config.fluorophore.wavelength_nm,
        )?;
        for emitter in &mut self.emitters {
            emitter.refresh_signatures(self.psf.as_ref());
        }
        for obstructor in &mut self.obstructors {
            obstructor.refocus(self.psf.as_ref());
        }
        debug!(
            "Stage z {z_um} um: recomputed signatures for {} emitters",
            self.emitters.len()
        );
        Ok(true)
    }

    pub fn psf(&self) -> &dyn PointSpreadFunction {
        self.psf.as_ref()
    }

    pub fn emitters(&self) -> &[Emitter] {
        &self.emitters
    }

    pub fn emitter_snapshots(&self) -> Vec<EmitterSnapshot> {
        self.emitters.iter().map(Emitter::snapshot).collect()
    }

    pub fn state_system(&self) -> &StateSystem {
        &self.config.fluorophore.system
    }

    /// Frames rendered or stepped so far
    pub fn frame_count(&self) -> u64 {
        self.frame_number
    }

    pub fn resolution(&self) -> PixelShape {
        self.config.camera.resolution
    }

    /// Current configuration, including the current laser power and stage z
    pub fn config(&self) -> &MicroscopeConfig {
        &self.config
    }
}
