//! Ground-truth event stream
//!
//! Listeners registered on a microscope see every state transition and every
//! emitter that was on during a frame. A microscope without listeners does no
//! event work.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::trace;
use serde::Serialize;

use crate::optics::Position;
use crate::photophysics::StateId;

/// A photophysical transition, timed in frames from the start of `frame`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitionEvent {
    pub frame: u64,
    pub emitter_id: u64,
    pub from: StateId,
    pub to: StateId,
    pub time: f64,
}

/// An emitter that spent time in an emitting state during `frame`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmissionEvent {
    pub frame: u64,
    pub emitter_id: u64,
    pub position: Position,
    pub on_time: f64,
    pub photons: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum SimulationEvent {
    Transition(TransitionEvent),
    Emission(EmissionEvent),
}

pub trait EventListener: Send {
    fn on_transition(&mut self, _event: &TransitionEvent) {}

    fn on_emission(&mut self, _event: &EmissionEvent) {}
}

/// Forwards every event into a channel. Once the receiver is dropped events
/// are discarded.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: Sender<SimulationEvent>,
}

impl ChannelListener {
    pub fn new(sender: Sender<SimulationEvent>) -> Self {
        Self { sender }
    }

    /// Listener plus the receiving end of a fresh unbounded channel
    pub fn unbounded() -> (Self, Receiver<SimulationEvent>) {
        let (sender, receiver) = unbounded();
        (Self::new(sender), receiver)
    }
}

impl EventListener for ChannelListener {
    fn on_transition(&mut self, event: &TransitionEvent) {
        let _ = self.sender.send(SimulationEvent::Transition(*event));
    }

    fn on_emission(&mut self, event: &EmissionEvent) {
        let _ = self.sender.send(SimulationEvent::Emission(*event));
    }
}

/// Writes events to the `log` facade at trace level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogListener;

impl EventListener for LogListener {
    fn on_transition(&mut self, event: &TransitionEvent) {
        trace!(
            "frame {} emitter {}: {} -> {} at t={:.4}",
            event.frame,
            event.emitter_id,
            event.from,
            event.to,
            event.time
        );
    }

    fn on_emission(&mut self, event: &EmissionEvent) {
        trace!(
            "frame {} emitter {} at ({:.2}, {:.2}, {:.3}): on {:.3}, {} photons",
            event.frame,
            event.emitter_id,
            event.position.x,
            event.position.y,
            event.position.z,
            event.on_time,
            event.photons
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition() -> TransitionEvent {
        TransitionEvent {
            frame: 3,
            emitter_id: 7,
            from: StateId(0),
            to: StateId(1),
            time: 0.25,
        }
    }

    #[test]
    fn test_channel_listener_forwards_in_order() {
        let (mut listener, receiver) = ChannelListener::unbounded();
        let emission = EmissionEvent {
            frame: 3,
            emitter_id: 7,
            position: Position::planar(1.0, 2.0),
            on_time: 0.25,
            photons: 120.0,
        };
        listener.on_transition(&transition());
        listener.on_emission(&emission);

        let events: Vec<_> = receiver.try_iter().collect();
        assert_eq!(
            events,
            vec![
                SimulationEvent::Transition(transition()),
                SimulationEvent::Emission(emission)
            ]
        );
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (mut listener, receiver) = ChannelListener::unbounded();
        drop(receiver);
        listener.on_transition(&transition());
    }

    #[test]
    fn test_log_listener_accepts_events() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut listener = LogListener;
        listener.on_transition(&transition());
    }

    #[test]
    fn test_events_serialize() {
        let json = serde_json::to_string(&SimulationEvent::Transition(transition())).unwrap();
        assert!(json.contains("\"emitter_id\":7"));
    }
}
