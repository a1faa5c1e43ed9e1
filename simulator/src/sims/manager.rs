//! Registry of independent simulation instances
//!
//! Each [`Simulation`] is guarded by its own mutex, so one caller drives an
//! instance at a time while other instances run unhindered. The registry map
//! is only locked for the duration of an insert, lookup or removal.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::{Mutex, RwLock};
use shared::{Frame, FrameError, FrameStack};

use super::microscope::{Microscope, MicroscopeConfig};
use crate::error::{Result, SimulationError};

/// Multiplier used to spread template seeds across cloned instances
const SEED_SPREAD: u64 = 0x9E37_79B9_7F4A_7C15;

/// Seed of an instance cloned from a template with seed `template_seed`
pub fn derive_seed(template_seed: u64, id: u64) -> u64 {
    template_seed ^ id.wrapping_mul(SEED_SPREAD)
}

/// One microscope plus its frame and emitter-count history
#[derive(Debug)]
pub struct Simulation {
    id: u64,
    microscope: Microscope,
    frames: FrameStack,
    emitter_counts: Vec<f64>,
}

impl Simulation {
    pub fn new(id: u64, config: MicroscopeConfig) -> Result<Self> {
        Ok(Self {
            id,
            microscope: Microscope::new(config)?,
            frames: FrameStack::new(),
            emitter_counts: Vec::new(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Render the next frame and append it and the on-emitter count to the
    /// history.
    pub fn step(&mut self) -> Result<&Frame> {
        let frame = self.microscope.simulate_frame()?;
        self.frames.push(frame)?;
        self.emitter_counts.push(self.microscope.on_emitter_count());
        Ok(self.frames.last().ok_or(FrameError::Empty)?)
    }

    /// Advance one frame without rendering; only the count is recorded.
    pub fn advance(&mut self) {
        self.microscope.increment_time_step();
        self.emitter_counts.push(self.microscope.on_emitter_count());
    }

    pub fn frames(&self) -> &FrameStack {
        &self.frames
    }

    pub fn emitter_count_history(&self) -> &[f64] {
        &self.emitter_counts
    }

    pub fn microscope(&self) -> &Microscope {
        &self.microscope
    }

    pub fn microscope_mut(&mut self) -> &mut Microscope {
        &mut self.microscope
    }
}

pub type SimulationHandle = Arc<Mutex<Simulation>>;

#[derive(Debug, Default)]
pub struct SimulationManager {
    simulations: RwLock<HashMap<u64, SimulationHandle>>,
    /// Configuration of the highest-id successful create, with that id
    template: Mutex<Option<(u64, MicroscopeConfig)>>,
    next_id: AtomicU64,
}

impl SimulationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a simulation from `config` and register it. The configuration
    /// becomes the template for [`SimulationManager::create_from_template`].
    ///
    /// Concurrent creates build in parallel. The template always ends up as
    /// the configuration of the registered instance with the highest id.
    pub fn create(&self, config: MicroscopeConfig) -> Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let simulation = Simulation::new(id, config.clone())?;
        self.register(simulation, config);
        Ok(id)
    }

    /// Build a simulation from the most recently used configuration.
    ///
    /// The new instance gets its own seed derived from the template seed and
    /// its id, so clones are independent but reproducible.
    pub fn create_from_template(&self) -> Result<u64> {
        let mut config = self
            .template
            .lock()
            .as_ref()
            .map(|(_, config)| config.clone())
            .ok_or(SimulationError::NoTemplate)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        config.seed = derive_seed(config.seed, id);
        let simulation = Simulation::new(id, config.clone())?;
        self.register(simulation, config);
        Ok(id)
    }

    /// The configuration the next [`SimulationManager::create_from_template`]
    /// starts from
    pub fn template(&self) -> Option<MicroscopeConfig> {
        self.template.lock().as_ref().map(|(_, config)| config.clone())
    }

    /// Insert under the template lock, so a later id never loses its
    /// template slot to an earlier one that finished building last.
    fn register(&self, simulation: Simulation, config: MicroscopeConfig) {
        let id = simulation.id();
        let mut template = self.template.lock();
        if template.as_ref().map_or(true, |(newest, _)| *newest < id) {
            *template = Some((id, config));
        }
        debug!(
            "Registered simulation {id}: {:?}",
            simulation.microscope()
        );
        self.simulations
            .write()
            .insert(id, Arc::new(Mutex::new(simulation)));
    }

    pub fn get(&self, id: u64) -> Result<SimulationHandle> {
        self.simulations
            .read()
            .get(&id)
            .cloned()
            .ok_or(SimulationError::UnknownSimulation(id))
    }

    /// Lock simulation `id` and run `f` on it
    pub fn with_simulation<T>(&self, id: u64, f: impl FnOnce(&mut Simulation) -> T) -> Result<T> {
        let handle = self.get(id)?;
        let mut simulation = handle.lock();
        Ok(f(&mut simulation))
    }

    /// Unregister simulation `id`. Callers still holding its handle keep a
    /// working instance.
    pub fn remove(&self, id: u64) -> Result<SimulationHandle> {
        let removed = self
            .simulations
            .write()
            .remove(&id)
            .ok_or(SimulationError::UnknownSimulation(id))?;
        debug!("Removed simulation {id}");
        Ok(removed)
    }

    /// Registered ids in ascending order
    pub fn ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.simulations.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.simulations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.simulations.read().is_empty()
    }
}
