//! Standard hardware presets
//!
//! Values are representative of common single-molecule localization setups,
//! not calibrated against a specific unit.

use once_cell::sync::Lazy;
use shared::PixelShape;

use super::{Camera, Laser, Objective, Stage};

/// Back-illuminated 512x512 EMCCD with 16 µm pixels
pub static EMCCD_512: Lazy<Camera> = Lazy::new(|| Camera {
    name: "EMCCD-512".to_string(),
    resolution: PixelShape::new(512, 512),
    pixel_size_um: 16.0,
    readout_noise_e: 74.4,
    thermal_noise_e: 0.0,
    dark_current_e: 0.002,
    quantum_efficiency: 0.9,
    em_gain: 100.0,
    adu_per_electron: 1.0 / 45.0,
    baseline_adu: 100.0,
    bit_depth: 16,
});

/// 2048x2048 scientific CMOS with 6.5 µm pixels
pub static SCMOS_2048: Lazy<Camera> = Lazy::new(|| Camera {
    name: "sCMOS-2048".to_string(),
    resolution: PixelShape::new(2048, 2048),
    pixel_size_um: 6.5,
    readout_noise_e: 1.6,
    thermal_noise_e: 0.0,
    dark_current_e: 0.06,
    quantum_efficiency: 0.72,
    em_gain: 0.0,
    adu_per_electron: 1.0 / 0.46,
    baseline_adu: 100.0,
    bit_depth: 16,
});

/// 100x oil-immersion TIRF objective
pub static OIL_100X_1_49: Lazy<Objective> = Lazy::new(|| Objective {
    numerical_aperture: 1.49,
    magnification: 100.0,
});

/// 60x water-immersion objective
pub static WATER_60X_1_27: Lazy<Objective> = Lazy::new(|| Objective {
    numerical_aperture: 1.27,
    magnification: 60.0,
});

/// 647 nm imaging laser, power in mW
pub static LASER_647: Lazy<Laser> = Lazy::new(|| Laser {
    wavelength_nm: 647.0,
    power: 10.0,
    min_power: 0.0,
    max_power: 500.0,
});

/// 405 nm activation laser, power in mW
pub static LASER_405: Lazy<Laser> = Lazy::new(|| Laser {
    wavelength_nm: 405.0,
    power: 0.0,
    min_power: 0.0,
    max_power: 100.0,
});

/// Stage at the origin with the focal plane at z = 0
pub static STAGE_ORIGIN: Lazy<Stage> = Lazy::new(Stage::default);
