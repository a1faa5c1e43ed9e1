//! Fluorophore flavours expressed as state systems
//!
//! Lifetimes are in frames. Power-driven lifetimes are the mean lifetime at
//! unit laser power, so doubling the power halves them.

use serde::{Deserialize, Serialize};

use super::rate::RateModel;
use super::state_system::{StateId, StateSpec, StateSystem, StateSystemError};

/// A fluorophore species: its state system, starting state and brightness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fluorophore {
    pub name: String,
    pub system: StateSystem,
    pub initial_state: StateId,
    /// Mean photons emitted during a fully-on frame
    pub signal_per_frame: f64,
    /// Emission wavelength in nanometres, used to size the PSF
    pub wavelength_nm: f64,
}

impl Fluorophore {
    pub fn new(
        name: impl Into<String>,
        system: StateSystem,
        initial_state: StateId,
        signal_per_frame: f64,
        wavelength_nm: f64,
    ) -> Result<Self, StateSystemError> {
        let fluorophore = Self {
            name: name.into(),
            system,
            initial_state,
            signal_per_frame,
            wavelength_nm,
        };
        fluorophore.validate()?;
        Ok(fluorophore)
    }

    pub fn validate(&self) -> Result<(), StateSystemError> {
        self.system.validate()?;
        self.system.check_state(self.initial_state)
    }
}

/// Rates of the five-state PALM model, per frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PalmRates {
    /// Activation, inactive -> on, per unit power
    pub k_a: f64,
    /// Bleaching, on -> bleached, per unit power
    pub k_b: f64,
    /// on -> dark-1
    pub k_d1: f64,
    /// on -> dark-2
    pub k_d2: f64,
    /// dark-1 -> on
    pub k_r1: f64,
    /// dark-2 -> on
    pub k_r2: f64,
}

impl Default for PalmRates {
    fn default() -> Self {
        Self {
            k_a: 1e-4,
            k_b: 0.05,
            k_d1: 0.1,
            k_d2: 0.02,
            k_r1: 0.5,
            k_r2: 0.01,
        }
    }
}

/// Three-state blinker that is photo-activated out of the dark state.
///
/// States `on`, `off`, `bleached`; starts `off`.
pub fn simple(
    signal_per_frame: f64,
    wavelength_nm: f64,
    t_on: f64,
    t_off: f64,
    t_bl: f64,
) -> Result<Fluorophore, StateSystemError> {
    let z = RateModel::ZERO;
    let system = StateSystem::new(
        vec![
            StateSpec::emitting("on"),
            StateSpec::dark("off"),
            StateSpec::dark("bleached"),
        ],
        vec![
            vec![z, RateModel::from_lifetime(t_on), RateModel::from_lifetime(t_bl)],
            vec![RateModel::from_lifetime_at_unit_power(t_off), z, z],
            vec![z, z, z],
        ],
    )?;
    Fluorophore::new("simple", system, StateId(1), signal_per_frame, wavelength_nm)
}

/// Photo-activatable protein with two reversible dark states.
///
/// States `inactive`, `on`, `dark-1`, `dark-2`, `bleached`; starts `inactive`.
pub fn palm(
    signal_per_frame: f64,
    wavelength_nm: f64,
    rates: PalmRates,
) -> Result<Fluorophore, StateSystemError> {
    let z = RateModel::ZERO;
    let c = RateModel::constant;
    let p = RateModel::proportional;
    let system = StateSystem::new(
        vec![
            StateSpec::dark("inactive"),
            StateSpec::emitting("on"),
            StateSpec::dark("dark-1"),
            StateSpec::dark("dark-2"),
            StateSpec::dark("bleached"),
        ],
        vec![
            vec![z, p(rates.k_a), z, z, z],
            vec![z, z, c(rates.k_d1), c(rates.k_d2), p(rates.k_b)],
            vec![z, c(rates.k_r1), z, z, z],
            vec![z, c(rates.k_r2), z, z, z],
            vec![z, z, z, z, z],
        ],
    )?;
    Fluorophore::new("palm", system, StateId(0), signal_per_frame, wavelength_nm)
}

/// Organic dye driven into a long-lived dark state by the imaging laser.
///
/// States `on`, `off`, `bleached`; starts `on`.
pub fn dstorm(
    signal_per_frame: f64,
    wavelength_nm: f64,
    t_on: f64,
    t_off: f64,
    t_bl: f64,
) -> Result<Fluorophore, StateSystemError> {
    let z = RateModel::ZERO;
    let system = StateSystem::new(
        vec![
            StateSpec::emitting("on"),
            StateSpec::dark("off"),
            StateSpec::dark("bleached"),
        ],
        vec![
            vec![
                z,
                RateModel::from_lifetime_at_unit_power(t_off),
                RateModel::from_lifetime_at_unit_power(t_bl),
            ],
            vec![RateModel::from_lifetime(t_on), z, z],
            vec![z, z, z],
        ],
    )?;
    Fluorophore::new("dstorm", system, StateId(0), signal_per_frame, wavelength_nm)
}
