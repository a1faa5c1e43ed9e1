//! Fluorescent point emitters
//!
//! An emitter owns its photophysical state, the rate table evaluated at the
//! last laser power it was told about, and the pixel signatures of its PSF.
//! Signatures only change when the emitter moves or the optics change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ndarray::Array2;
use rand::Rng;
use serde::Serialize;
use shared::image_proc::sample_poisson;
use shared::PixelShape;

use crate::optics::{PixelSignature, PointSpreadFunction, Position};
use crate::photophysics::{RateTable, StateAdvance, StateId, StateSystem, Transition};

static NEXT_EMITTER_ID: AtomicU64 = AtomicU64::new(0);

/// Next process-wide emitter id
pub fn next_emitter_id() -> u64 {
    NEXT_EMITTER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Add `photons` spread over `signatures` to `image`, indexed `[[y, x]]`.
///
/// Pixels outside the image are dropped. Returns the photons actually
/// deposited.
pub fn deposit_signatures(
    signatures: &[PixelSignature],
    photons: f64,
    image: &mut Array2<f64>,
) -> f64 {
    if photons == 0.0 {
        return 0.0;
    }
    let shape = PixelShape::from_array_dim(image.dim());
    let mut deposited = 0.0;
    for signature in signatures {
        if let Some(index) = shape.index_of(signature.x, signature.y) {
            let share = photons * signature.fraction;
            image[index] += share;
            deposited += share;
        }
    }
    deposited
}

/// PSF signatures for `position`, with the degenerate single-pixel case
/// given the full brightness.
pub fn signatures_for(psf: &dyn PointSpreadFunction, position: &Position) -> Vec<PixelSignature> {
    let mut signatures = psf.pixel_signatures(position);
    if let [only] = signatures.as_mut_slice() {
        if only.fraction == 0.0 {
            only.fraction = 1.0;
        }
    }
    signatures
}

/// Ground truth for one emitter
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmitterSnapshot {
    pub id: u64,
    pub position: Position,
    pub state: StateId,
    pub emitting: bool,
}

#[derive(Debug, Clone)]
pub struct Emitter {
    id: u64,
    position: Position,
    state: StateId,
    signal: f64,
    system: Arc<StateSystem>,
    cached_power: f64,
    rates: RateTable,
    signatures: Vec<PixelSignature>,
}

impl Emitter {
    pub fn new(
        position: Position,
        system: Arc<StateSystem>,
        initial_state: StateId,
        signal: f64,
        power: f64,
        psf: &dyn PointSpreadFunction,
    ) -> Self {
        let rates = system.rates_at(power);
        let signatures = signatures_for(psf, &position);
        Self {
            id: next_emitter_id(),
            position,
            state: initial_state,
            signal,
            system,
            cached_power: power,
            rates,
            signatures,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn state(&self) -> StateId {
        self.state
    }

    /// Mean photons per fully-on frame
    pub fn signal(&self) -> f64 {
        self.signal
    }

    pub fn cached_power(&self) -> f64 {
        self.cached_power
    }

    pub fn signatures(&self) -> &[PixelSignature] {
        &self.signatures
    }

    pub fn is_emitting(&self) -> bool {
        self.system.is_emitting(self.state)
    }

    /// True once the emitter has reached a state it can never leave
    pub fn is_terminal(&self) -> bool {
        self.system.is_terminal(self.state)
    }

    pub fn snapshot(&self) -> EmitterSnapshot {
        EmitterSnapshot {
            id: self.id,
            position: self.position,
            state: self.state,
            emitting: self.is_emitting(),
        }
    }

    /// Re-evaluate the rate table for a new laser power.
    ///
    /// Returns `false` without touching the table if `power` equals the
    /// cached power.
    pub fn update_power(&mut self, power: f64) -> bool {
        if self.cached_power == power {
            return false;
        }
        self.rates = self.system.rates_at(power);
        self.cached_power = power;
        true
    }

    /// Advance the photophysical state through one frame
    pub fn step<R, F>(&mut self, duration: f64, rng: &mut R, on_transition: F) -> StateAdvance
    where
        R: Rng + ?Sized,
        F: FnMut(Transition),
    {
        let advance = self
            .system
            .advance(self.state, &self.rates, duration, rng, on_transition);
        self.state = advance.state;
        advance
    }

    /// Photon count for a frame with `on_time` spent emitting
    pub fn flicker<R: Rng + ?Sized>(&self, on_time: f64, rng: &mut R) -> f64 {
        sample_poisson(on_time * self.signal, rng)
    }

    /// Spread `photons` over the emitter's pixels. Off-image pixels are lost.
    pub fn deposit(&self, photons: f64, image: &mut Array2<f64>) -> f64 {
        deposit_signatures(&self.signatures, photons, image)
    }

    pub fn set_position(&mut self, position: Position, psf: &dyn PointSpreadFunction) {
        self.position = position;
        self.refresh_signatures(psf);
    }

    /// Recompute signatures after an optical change
    pub fn refresh_signatures(&mut self, psf: &dyn PointSpreadFunction) {
        self.signatures = signatures_for(psf, &self.position);
    }
}
