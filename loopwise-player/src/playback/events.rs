//! Internal engine telemetry (not exposed to UI listeners)
//!
//! The engine emits these over an unbounded mpsc channel; the coordinator
//! consumes them on its own context and converts the relevant ones into
//! `loopwise_common::events::PracticeEvent` broadcasts.
//!
//! Every event carries the load generation that produced it. Consumers drop
//! events whose generation is not the engine's current one.

/// Engine → coordinator telemetry
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Duration resolved for a load (0.0 when unknown)
    DurationResolved { generation: u64, duration: f64 },

    /// Player constructed for a load
    Ready { generation: u64 },

    /// Periodic position sample
    ///
    /// One event per tick: the time update and the loop boundary check are
    /// both derived from this single sample.
    PositionTick { generation: u64, position: f64 },

    /// Observed playing/paused transition (edge-triggered)
    PlayingChanged { generation: u64, playing: bool },

    /// Natural end-of-track, once per completion
    TrackEnded { generation: u64 },
}

impl EngineEvent {
    pub fn generation(&self) -> u64 {
        match self {
            EngineEvent::DurationResolved { generation, .. }
            | EngineEvent::Ready { generation }
            | EngineEvent::PositionTick { generation, .. }
            | EngineEvent::PlayingChanged { generation, .. }
            | EngineEvent::TrackEnded { generation } => *generation,
        }
    }
}
