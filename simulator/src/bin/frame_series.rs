//! Frame series generator
//!
//! Runs one simulated acquisition and prints per-frame ground truth: the
//! number of emitters on, the summed ADU and the brightest pixel. Set
//! `RUST_LOG=trace` to also see every state transition.
//!
//! Usage:
//! ```
//! cargo run --release --bin frame_series -- [OPTIONS]
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use simulator::events::LogListener;
use simulator::hardware::models;
use simulator::hardware::Camera;
use simulator::photophysics::{presets, Fluorophore, PalmRates};
use simulator::scene::{BackgroundConfig, EmitterLayout};
use simulator::{MicroscopeConfig, PsfConfig, SimulationManager};

/// Fluorophore flavours
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Dye {
    /// Three-state blinker activated by the laser
    Simple,
    /// Photo-activatable protein with two dark states
    Palm,
    /// Organic dye switched off by the laser
    Dstorm,
}

impl std::fmt::Display for Dye {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dye::Simple => write!(f, "simple"),
            Dye::Palm => write!(f, "palm"),
            Dye::Dstorm => write!(f, "dstorm"),
        }
    }
}

impl Dye {
    fn fluorophore(&self, signal: f64) -> Result<Fluorophore> {
        let fluorophore = match self {
            Dye::Simple => presets::simple(signal, 647.0, 3.0, 200.0, 300.0)?,
            Dye::Palm => presets::palm(signal, 580.0, PalmRates::default())?,
            Dye::Dstorm => presets::dstorm(signal, 670.0, 50.0, 2.0, 400.0)?,
        };
        Ok(fluorophore)
    }
}

/// Camera models
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CameraModel {
    Emccd,
    Scmos,
}

impl std::fmt::Display for CameraModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraModel::Emccd => write!(f, "emccd"),
            CameraModel::Scmos => write!(f, "scmos"),
        }
    }
}

impl CameraModel {
    fn to_config(&self) -> &'static Camera {
        match self {
            CameraModel::Emccd => &models::EMCCD_512,
            CameraModel::Scmos => &models::SCMOS_2048,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "Frame Series",
    about = "Generates a series of synthetic single-molecule frames",
    long_about = None
)]
struct Args {
    /// Fluorophore flavour
    #[arg(long, default_value_t = Dye::Dstorm)]
    dye: Dye,

    /// Camera model
    #[arg(long, default_value_t = CameraModel::Emccd)]
    camera: CameraModel,

    /// Crop the sensor to an NxN region
    #[arg(long, default_value_t = 128)]
    size: usize,

    /// Number of emitters, placed uniformly at random
    #[arg(short = 'n', long, default_value_t = 200)]
    emitters: usize,

    /// Mean photons per fully-on frame
    #[arg(long, default_value_t = 2000.0)]
    signal: f64,

    /// Uniform background photons per pixel
    #[arg(long, default_value_t = 10.0)]
    background: f64,

    /// Number of frames to render
    #[arg(short = 'f', long, default_value_t = 100)]
    frames: usize,

    /// Initial laser power
    #[arg(long, default_value_t = 10.0)]
    power: f64,

    /// Laser power added after every frame
    #[arg(long, default_value_t = 0.0)]
    power_step: f64,

    /// Use the defocus-aware PSF with this depth of field in microns
    #[arg(long)]
    depth_of_field_um: Option<f64>,

    /// Random seed
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let camera = args
        .camera
        .to_config()
        .with_resolution((args.size, args.size).into());
    let mut laser = (*models::LASER_647).clone();
    laser.power = args.power.clamp(laser.min_power, laser.max_power);

    let mut config = MicroscopeConfig::new(
        camera,
        laser,
        (*models::OIL_100X_1_49).clone(),
        args.dye.fluorophore(args.signal)?,
    );
    config.layout = EmitterLayout::RandomUniform {
        count: args.emitters,
        z_min_um: -0.3,
        z_max_um: 0.3,
    };
    config.background = BackgroundConfig::Uniform {
        photons: args.background,
    };
    if let Some(depth_of_field_um) = args.depth_of_field_um {
        config.psf = PsfConfig::Gaussian3D {
            cutoff_sigmas: 3.0,
            depth_of_field_um,
        };
    }
    config.seed = args.seed;
    debug!("{config:?}");

    let manager = SimulationManager::new();
    let id = manager
        .create(config)
        .context("failed to build the microscope")?;
    let handle = manager.get(id)?;
    let mut simulation = handle.lock();
    simulation
        .microscope_mut()
        .add_listener(Box::new(LogListener));

    info!(
        "Simulating {} frames of {} '{}' emitters on a {}x{} {} crop",
        args.frames, args.emitters, args.dye, args.size, args.size, args.camera
    );
    println!("frame,laser_power,on_emitters,total_adu,max_adu");

    for _ in 0..args.frames {
        let power = simulation.microscope().laser_power();
        let (number, total, max) = {
            let frame = simulation.step()?;
            let max = frame.pixels().iter().copied().max().unwrap_or(0);
            (frame.frame_number(), frame.total(), max)
        };
        let on = simulation.microscope().on_emitter_count();
        println!("{number},{power:.3},{on},{total},{max}");

        if args.power_step != 0.0 {
            let next = simulation.microscope().laser_power() + args.power_step;
            simulation.microscope_mut().set_laser_power(next)?;
        }
    }

    let microscope = simulation.microscope();
    info!(
        "Done: {} of {} emitters bleached, {} rate recomputations",
        microscope.terminal_emitter_count(),
        microscope.emitters().len(),
        microscope.rate_recomputations()
    );
    Ok(())
}
