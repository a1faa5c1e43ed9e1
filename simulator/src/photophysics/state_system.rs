//! Continuous-time photophysical state machine
//!
//! A [`StateSystem`] is a small set of named states and a square matrix of
//! [`RateModel`]s. Advancing an emitter through one frame runs a race of
//! independent exponential clocks, one per outgoing transition of the current
//! state: the clock that rings first decides where the emitter goes and when.
//! The race is repeated from the new state until the frame duration is used up.
//! Time spent in emitting states is accumulated as the frame's on-time.
//!
//! The race draws one uniform per finite positive rate, in ascending
//! destination order, and is statistically identical to drawing one
//! exponential with the summed rate and picking the destination in proportion
//! to its rate. Only the per-transition form is used, so a seed always maps to
//! the same trajectory.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::rate::RateModel;

/// Index of a state inside its [`StateSystem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub usize);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Name and emission flag of one state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSpec {
    pub name: String,
    pub emitting: bool,
}

impl StateSpec {
    pub fn emitting(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            emitting: true,
        }
    }

    pub fn dark(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            emitting: false,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateSystemError {
    #[error("State system needs at least one state")]
    NoStates,
    #[error("Rate matrix row {row} has {found} entries, expected {expected}")]
    RowLength {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("Rate matrix has {found} rows, expected {expected}")]
    RowCount { found: usize, expected: usize },
    #[error("State {0} has a non-zero self-transition")]
    SelfTransition(StateId),
    #[error("Rate {from} -> {to} is malformed (base {base}, slope {slope})")]
    InvalidRate {
        from: StateId,
        to: StateId,
        base: f64,
        slope: f64,
    },
    #[error("Rate {from} -> {to} evaluates to {rate} at laser power {power}")]
    NegativeRate {
        from: StateId,
        to: StateId,
        power: f64,
        rate: f64,
    },
    #[error("Instant transitions form a cycle through state {0}")]
    InstantCycle(StateId),
    #[error("Unknown state {0}")]
    UnknownState(StateId),
    #[error("Power floor must be finite and non-negative, got {0}")]
    InvalidPowerFloor(f64),
}

/// A fired transition, timed from the start of the frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: StateId,
    pub to: StateId,
    pub time: f64,
}

/// Outcome of advancing one emitter through one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateAdvance {
    /// State at the end of the frame
    pub state: StateId,
    /// Time spent in emitting states, in `[0, duration]`
    pub on_time: f64,
    /// Number of transitions that fired
    pub transitions: usize,
}

/// Rates of every transition evaluated at one laser power
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    power: f64,
    size: usize,
    rates: Vec<f64>,
}

impl RateTable {
    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn rate(&self, from: StateId, to: StateId) -> f64 {
        if from.0 >= self.size || to.0 >= self.size {
            return 0.0;
        }
        self.rates[from.0 * self.size + to.0]
    }

    /// Rates out of `from`, indexed by destination
    pub fn outgoing(&self, from: StateId) -> &[f64] {
        if from.0 >= self.size {
            return &[];
        }
        &self.rates[from.0 * self.size..(from.0 + 1) * self.size]
    }

    pub fn total_outgoing(&self, from: StateId) -> f64 {
        self.outgoing(from).iter().sum()
    }
}

/// Photophysical states plus the rate matrix connecting them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSystem {
    states: Vec<StateSpec>,
    rates: Vec<Vec<RateModel>>,
    #[serde(default)]
    power_floor: f64,
}

impl StateSystem {
    /// Build and validate a state system.
    ///
    /// `rates[from][to]` is the transition from `from` to `to`. The diagonal
    /// must be zero.
    pub fn new(
        states: Vec<StateSpec>,
        rates: Vec<Vec<RateModel>>,
    ) -> Result<Self, StateSystemError> {
        let system = Self {
            states,
            rates,
            power_floor: 0.0,
        };
        system.validate()?;
        Ok(system)
    }

    /// Set the laser power at or below which power-dependent terms vanish
    pub fn with_power_floor(mut self, power_floor: f64) -> Result<Self, StateSystemError> {
        if !power_floor.is_finite() || power_floor < 0.0 {
            return Err(StateSystemError::InvalidPowerFloor(power_floor));
        }
        self.power_floor = power_floor;
        Ok(self)
    }

    /// Structural checks: shape, diagonal, malformed entries, instant cycles
    pub fn validate(&self) -> Result<(), StateSystemError> {
        let n = self.states.len();
        if n == 0 {
            return Err(StateSystemError::NoStates);
        }
        if self.rates.len() != n {
            return Err(StateSystemError::RowCount {
                found: self.rates.len(),
                expected: n,
            });
        }
        if !self.power_floor.is_finite() || self.power_floor < 0.0 {
            return Err(StateSystemError::InvalidPowerFloor(self.power_floor));
        }
        for (from, row) in self.rates.iter().enumerate() {
            if row.len() != n {
                return Err(StateSystemError::RowLength {
                    row: from,
                    found: row.len(),
                    expected: n,
                });
            }
            for (to, rate) in row.iter().enumerate() {
                if from == to {
                    if !rate.is_zero() {
                        return Err(StateSystemError::SelfTransition(StateId(from)));
                    }
                    continue;
                }
                let base_ok = !rate.base.is_nan() && rate.base != f64::NEG_INFINITY;
                if !base_ok || !rate.slope.is_finite() {
                    return Err(StateSystemError::InvalidRate {
                        from: StateId(from),
                        to: StateId(to),
                        base: rate.base,
                        slope: rate.slope,
                    });
                }
            }
        }
        self.check_instant_cycles()
    }

    /// Every rate must be non-negative across the laser's operating range.
    pub fn validate_power_range(
        &self,
        min_power: f64,
        max_power: f64,
    ) -> Result<(), StateSystemError> {
        for (from, row) in self.rates.iter().enumerate() {
            for (to, rate) in row.iter().enumerate() {
                if from == to || rate.is_instant() {
                    continue;
                }
                let mut probes = vec![min_power, max_power];
                if min_power <= self.power_floor {
                    probes.push(0.0);
                }
                for power in probes {
                    let value = rate.base + rate.slope * power;
                    if value < 0.0 {
                        return Err(StateSystemError::NegativeRate {
                            from: StateId(from),
                            to: StateId(to),
                            power,
                            rate: value,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    // Instant transitions are followed deterministically (lowest destination
    // wins), so a cycle among them would never consume frame time.
    fn check_instant_cycles(&self) -> Result<(), StateSystemError> {
        let n = self.states.len();
        let first_instant = |state: usize| {
            self.rates[state]
                .iter()
                .enumerate()
                .find(|(to, rate)| *to != state && rate.is_instant())
                .map(|(to, _)| to)
        };
        for start in 0..n {
            let mut current = start;
            for _ in 0..n {
                match first_instant(current) {
                    Some(next) => current = next,
                    None => break,
                }
            }
            if first_instant(current).is_some() {
                return Err(StateSystemError::InstantCycle(StateId(current)));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> &[StateSpec] {
        &self.states
    }

    pub fn state(&self, id: StateId) -> Option<&StateSpec> {
        self.states.get(id.0)
    }

    /// Look a state up by name
    pub fn find(&self, name: &str) -> Option<StateId> {
        self.states.iter().position(|s| s.name == name).map(StateId)
    }

    pub fn check_state(&self, id: StateId) -> Result<(), StateSystemError> {
        if id.0 < self.states.len() {
            Ok(())
        } else {
            Err(StateSystemError::UnknownState(id))
        }
    }

    pub fn is_emitting(&self, id: StateId) -> bool {
        self.states.get(id.0).is_some_and(|s| s.emitting)
    }

    /// True if no transition out of `id` can fire at any power
    pub fn is_terminal(&self, id: StateId) -> bool {
        self.rates
            .get(id.0)
            .map_or(true, |row| row.iter().all(RateModel::is_zero))
    }

    pub fn rate_model(&self, from: StateId, to: StateId) -> Option<RateModel> {
        self.rates.get(from.0).and_then(|row| row.get(to.0)).copied()
    }

    pub fn power_floor(&self) -> f64 {
        self.power_floor
    }

    /// Evaluate every transition at `power`
    pub fn rates_at(&self, power: f64) -> RateTable {
        let size = self.states.len();
        let rates = self
            .rates
            .iter()
            .enumerate()
            .flat_map(|(from, row)| {
                row.iter().enumerate().map(move |(to, rate)| {
                    if from == to {
                        0.0
                    } else {
                        rate.evaluate(power, self.power_floor)
                    }
                })
            })
            .collect();
        RateTable { power, size, rates }
    }

    /// Run the exponential race out of `from` once.
    ///
    /// Returns the winning destination and its waiting time, or `None` if no
    /// outgoing transition has a positive rate.
    fn race<R: Rng + ?Sized>(
        &self,
        from: StateId,
        rates: &RateTable,
        rng: &mut R,
    ) -> Option<(StateId, f64)> {
        let mut winner: Option<(StateId, f64)> = None;
        for (to, &rate) in rates.outgoing(from).iter().enumerate() {
            if to == from.0 || !(rate > 0.0) {
                continue;
            }
            let waiting = if rate.is_infinite() {
                0.0
            } else {
                let u: f64 = rng.gen();
                -(1.0 - u).ln() / rate
            };
            if winner.map_or(true, |(_, best)| waiting < best) {
                winner = Some((StateId(to), waiting));
            }
        }
        winner
    }

    /// Advance from `start` through `duration` frames of time.
    ///
    /// Leftover time after the last transition is credited to the state the
    /// emitter is in when the frame ends. `on_transition` sees every fired
    /// transition in order.
    pub fn advance<R, F>(
        &self,
        start: StateId,
        rates: &RateTable,
        duration: f64,
        rng: &mut R,
        mut on_transition: F,
    ) -> StateAdvance
    where
        R: Rng + ?Sized,
        F: FnMut(Transition),
    {
        let mut state = start;
        let mut elapsed = 0.0;
        let mut on_time = 0.0;
        let mut transitions = 0;

        while elapsed < duration {
            let remaining = duration - elapsed;
            let emitting = self.is_emitting(state);

            match self.race(state, rates, rng) {
                Some((to, waiting)) if waiting < remaining => {
                    if emitting {
                        on_time += waiting;
                    }
                    elapsed += waiting;
                    on_transition(Transition {
                        from: state,
                        to,
                        time: elapsed,
                    });
                    state = to;
                    transitions += 1;
                }
                _ => {
                    if emitting {
                        on_time += remaining;
                    }
                    break;
                }
            }
        }

        StateAdvance {
            state,
            on_time: on_time.min(duration.max(0.0)),
            transitions,
        }
    }

    /// Convenience form of [`StateSystem::advance`] that evaluates the rates
    /// at `power` first and ignores transition events.
    pub fn advance_at_power<R: Rng + ?Sized>(
        &self,
        start: StateId,
        power: f64,
        duration: f64,
        rng: &mut R,
    ) -> StateAdvance {
        let rates = self.rates_at(power);
        self.advance(start, &rates, duration, rng, |_| {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn on_bleached(on_to_bleached: RateModel) -> StateSystem {
        StateSystem::new(
            vec![StateSpec::emitting("active"), StateSpec::dark("bleached")],
            vec![
                vec![RateModel::ZERO, on_to_bleached],
                vec![RateModel::ZERO, RateModel::ZERO],
            ],
        )
        .unwrap()
    }

    fn on_off(k_on: f64, k_off: f64) -> StateSystem {
        StateSystem::new(
            vec![StateSpec::emitting("on"), StateSpec::dark("off")],
            vec![
                vec![RateModel::ZERO, RateModel::constant(k_off)],
                vec![RateModel::constant(k_on), RateModel::ZERO],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_never_bleaching_stays_on_for_whole_frame() {
        let system = on_bleached(RateModel::new(0.0, 0.0));
        let mut rng = StdRng::seed_from_u64(0);
        let result = system.advance_at_power(StateId(0), 1.0, 1.0, &mut rng);
        assert_eq!(result.state, StateId(0));
        assert_eq!(result.on_time, 1.0);
        assert_eq!(result.transitions, 0);
    }

    #[test]
    fn test_absorbing_states_keep_state_at_any_power() {
        let system = on_bleached(RateModel::ZERO);
        let mut rng = StdRng::seed_from_u64(1);
        for power in [0.0, 0.5, 10.0, 1e6] {
            let active = system.advance_at_power(StateId(0), power, 1.0, &mut rng);
            assert_eq!(active.state, StateId(0));
            assert_eq!(active.on_time, 1.0);

            let bleached = system.advance_at_power(StateId(1), power, 1.0, &mut rng);
            assert_eq!(bleached.state, StateId(1));
            assert_eq!(bleached.on_time, 0.0);
        }
        assert!(system.is_terminal(StateId(1)));
    }

    #[test]
    fn test_instant_transition_fires_at_time_zero() {
        let system = on_bleached(RateModel::INSTANT);
        let mut rng = StdRng::seed_from_u64(2);
        let mut events = Vec::new();
        let result = system.advance(
            StateId(0),
            &system.rates_at(1.0),
            1.0,
            &mut rng,
            |t| events.push(t),
        );
        assert_eq!(result.state, StateId(1));
        assert_eq!(result.on_time, 0.0);
        assert_eq!(
            events,
            vec![Transition {
                from: StateId(0),
                to: StateId(1),
                time: 0.0
            }]
        );
    }

    #[test]
    fn test_zero_power_disables_power_driven_transitions() {
        let system = on_bleached(RateModel::proportional(1e9));
        let mut rng = StdRng::seed_from_u64(3);
        let result = system.advance_at_power(StateId(0), 0.0, 1.0, &mut rng);
        assert_eq!(result.state, StateId(0));
        assert_eq!(result.on_time, 1.0);
    }

    #[test]
    fn test_power_floor() {
        let system = on_bleached(RateModel::proportional(1e9))
            .with_power_floor(0.5)
            .unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        let below = system.advance_at_power(StateId(0), 0.4, 1.0, &mut rng);
        assert_eq!(below.state, StateId(0));
        let above = system.advance_at_power(StateId(0), 0.6, 1.0, &mut rng);
        assert_eq!(above.state, StateId(1));
        assert!(above.on_time < 1e-6);
    }

    #[test]
    fn test_long_run_on_fraction() {
        let (k_on, k_off) = (0.3, 0.9);
        let system = on_off(k_on, k_off);
        let rates = system.rates_at(1.0);
        let mut rng = StdRng::seed_from_u64(5);

        let frames = 200_000;
        let mut state = StateId(0);
        let mut total_on = 0.0;
        for _ in 0..frames {
            let result = system.advance(state, &rates, 1.0, &mut rng, |_| {});
            total_on += result.on_time;
            state = result.state;
        }

        let fraction = total_on / frames as f64;
        assert_relative_eq!(fraction, k_on / (k_on + k_off), epsilon = 0.01);
    }

    #[test]
    fn test_on_time_bounded_by_duration() {
        let system = on_off(5.0, 5.0);
        let rates = system.rates_at(0.0);
        let mut rng = StdRng::seed_from_u64(6);
        let mut state = StateId(0);
        for _ in 0..1000 {
            let result = system.advance(state, &rates, 1.0, &mut rng, |_| {});
            assert!(result.on_time >= 0.0 && result.on_time <= 1.0);
            state = result.state;
        }
    }

    #[test]
    fn test_transition_times_increase_within_frame() {
        let system = on_off(20.0, 20.0);
        let rates = system.rates_at(0.0);
        let mut rng = StdRng::seed_from_u64(7);
        let mut events = Vec::new();
        let result = system.advance(StateId(0), &rates, 1.0, &mut rng, |t| events.push(t));

        assert_eq!(events.len(), result.transitions);
        assert!(!events.is_empty());
        for pair in events.windows(2) {
            assert!(pair[0].time <= pair[1].time);
            assert_eq!(pair[0].to, pair[1].from);
        }
        assert!(events.iter().all(|t| t.time < 1.0));
    }

    #[test]
    fn test_same_seed_same_trajectory() {
        let system = on_off(2.0, 3.0);
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let rates = system.rates_at(0.0);
            (0..50)
                .scan(StateId(0), |state, _| {
                    let r = system.advance(*state, &rates, 1.0, &mut rng, |_| {});
                    *state = r.state;
                    Some(r.on_time)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(11), run(11));
        assert_ne!(run(11), run(12));
    }

    #[test]
    fn test_validation_errors() {
        let states = || vec![StateSpec::emitting("a"), StateSpec::dark("b")];

        assert_eq!(
            StateSystem::new(vec![], vec![]).unwrap_err(),
            StateSystemError::NoStates
        );
        assert!(matches!(
            StateSystem::new(states(), vec![vec![RateModel::ZERO; 2]]),
            Err(StateSystemError::RowCount { .. })
        ));
        assert!(matches!(
            StateSystem::new(states(), vec![vec![RateModel::ZERO; 2], vec![RateModel::ZERO]]),
            Err(StateSystemError::RowLength { row: 1, .. })
        ));
        assert_eq!(
            StateSystem::new(
                states(),
                vec![
                    vec![RateModel::constant(1.0), RateModel::ZERO],
                    vec![RateModel::ZERO; 2]
                ]
            )
            .unwrap_err(),
            StateSystemError::SelfTransition(StateId(0))
        );
        assert!(matches!(
            StateSystem::new(
                states(),
                vec![
                    vec![RateModel::ZERO, RateModel::new(f64::NAN, 0.0)],
                    vec![RateModel::ZERO; 2]
                ]
            ),
            Err(StateSystemError::InvalidRate { .. })
        ));
        assert!(matches!(
            StateSystem::new(
                states(),
                vec![
                    vec![RateModel::ZERO, RateModel::INSTANT],
                    vec![RateModel::INSTANT, RateModel::ZERO]
                ]
            ),
            Err(StateSystemError::InstantCycle(_))
        ));
    }

    #[test]
    fn test_negative_rate_in_operating_range() {
        let system = on_bleached(RateModel::new(1.0, -0.5));
        assert!(system.validate_power_range(0.0, 2.0).is_ok());
        assert!(matches!(
            system.validate_power_range(0.0, 3.0),
            Err(StateSystemError::NegativeRate { power, .. }) if power == 3.0
        ));
    }

    #[test]
    fn test_lookup_helpers() {
        let system = on_off(1.0, 2.0);
        assert_eq!(system.find("off"), Some(StateId(1)));
        assert_eq!(system.find("missing"), None);
        assert!(system.is_emitting(StateId(0)));
        assert!(!system.is_emitting(StateId(9)));
        assert!(system.check_state(StateId(2)).is_err());

        let table = system.rates_at(0.0);
        assert_eq!(table.rate(StateId(0), StateId(1)), 2.0);
        assert_eq!(table.total_outgoing(StateId(1)), 1.0);
        assert_eq!(table.outgoing(StateId(5)), &[] as &[f64]);
    }
}
