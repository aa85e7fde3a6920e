//! Event types for the Loopwise event system
//!
//! Provides the UI-facing event enum and the EventBus used by the player
//! coordinator to notify any number of listeners (views, persistence,
//! the headless runner).

use crate::models::{FileId, LoopMode, Segment, SegmentId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Practice session events
///
/// Events are broadcast via EventBus and can be serialized for transport to
/// a UI process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PracticeEvent {
    /// A file became the active file and its load started
    FileChanged {
        file: FileId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Media duration resolved (0.0 when unknown)
    DurationResolved {
        file: FileId,
        duration: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Player constructed and ready for playback
    Ready {
        file: FileId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Position sample, emitted once per engine tick
    TimeUpdate {
        position: f64,
        duration: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Observed playing/paused transition
    PlayingChanged {
        playing: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback crossed B and was sent back to A
    Looped {
        from: f64,
        to: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A/B markers changed
    RegionChanged {
        point_a: Option<f64>,
        point_b: Option<f64>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A new segment was saved
    SegmentSaved {
        segment: Segment,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A segment became the active segment
    SegmentSelected {
        segment_id: SegmentId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Loop mode changed
    LoopModeChanged {
        mode: LoopMode,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Loading a file failed (resource access could not be granted)
    LoadFailed {
        file: FileId,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Track ended and the queue had nothing further to play
    Stopped {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PracticeEvent {
    /// Event type name, matching the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            PracticeEvent::FileChanged { .. } => "FileChanged",
            PracticeEvent::DurationResolved { .. } => "DurationResolved",
            PracticeEvent::Ready { .. } => "Ready",
            PracticeEvent::TimeUpdate { .. } => "TimeUpdate",
            PracticeEvent::PlayingChanged { .. } => "PlayingChanged",
            PracticeEvent::Looped { .. } => "Looped",
            PracticeEvent::RegionChanged { .. } => "RegionChanged",
            PracticeEvent::SegmentSaved { .. } => "SegmentSaved",
            PracticeEvent::SegmentSelected { .. } => "SegmentSelected",
            PracticeEvent::LoopModeChanged { .. } => "LoopModeChanged",
            PracticeEvent::LoadFailed { .. } => "LoadFailed",
            PracticeEvent::Stopped { .. } => "Stopped",
        }
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use loopwise_common::events::{EventBus, PracticeEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(PracticeEvent::PlayingChanged {
///     playing: true,
///     timestamp: chrono::Utc::now(),
/// });
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.event_type(), "PlayingChanged");
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PracticeEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PracticeEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PracticeEvent,
    ) -> Result<usize, broadcast::error::SendError<PracticeEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PracticeEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
