//! Common builders for simulator integration tests

#![allow(dead_code)]

use shared::PixelShape;
use simulator::hardware::models::{LASER_647, OIL_100X_1_49};
use simulator::hardware::Camera;
use simulator::photophysics::{presets, Fluorophore, RateModel, StateId, StateSpec, StateSystem};
use simulator::scene::EmitterLayout;
use simulator::{MicroscopeConfig, Position};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Noise-free camera with unit gain and a baseline of 100 ADU
pub fn quiet_camera(size: usize) -> Camera {
    let mut camera = Camera::ideal(PixelShape::new(size, size), 16.0).unwrap();
    camera.baseline_adu = 100.0;
    camera
}

/// Two states, `active` and `bleached`, with a never-firing bleach rate
pub fn never_bleaching() -> StateSystem {
    StateSystem::new(
        vec![StateSpec::emitting("active"), StateSpec::dark("bleached")],
        vec![
            vec![RateModel::ZERO, RateModel::new(0.0, 0.0)],
            vec![RateModel::ZERO, RateModel::ZERO],
        ],
    )
    .unwrap()
}

pub fn steady_fluorophore(signal: f64) -> Fluorophore {
    Fluorophore::new("steady", never_bleaching(), StateId(0), signal, 647.0).unwrap()
}

pub fn config(camera: Camera, fluorophore: Fluorophore, positions: Vec<Position>) -> MicroscopeConfig {
    let mut config = MicroscopeConfig::new(
        camera,
        (*LASER_647).clone(),
        (*OIL_100X_1_49).clone(),
        fluorophore,
    );
    config.layout = EmitterLayout::Explicit { positions };
    config
}

/// dSTORM population spread over a 64x64 sensor
pub fn dstorm_config(count: usize, seed: u64) -> MicroscopeConfig {
    let fluorophore = presets::dstorm(2000.0, 670.0, 30.0, 1.0, 300.0).unwrap();
    let mut config = config(quiet_camera(64), fluorophore, Vec::new());
    config.layout = EmitterLayout::RandomUniform {
        count,
        z_min_um: 0.0,
        z_max_um: 0.0,
    };
    config.seed = seed;
    config
}
