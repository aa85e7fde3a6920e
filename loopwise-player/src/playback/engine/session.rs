//! The single active media session
//!
//! A `MediaHandle` is created by a successful load and owned by the engine's
//! session slot. It is never shared: observers hold only a clone of the player
//! handle, never the session itself.

use crate::media::{MediaPlayer, ResolvedSource};
use loopwise_common::time::sanitize_seconds;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::debug;

/// Player shared between the session and its observer tasks
pub(super) type SharedPlayer = Arc<Mutex<Box<dyn MediaPlayer>>>;

pub(super) fn lock_player(player: &SharedPlayer) -> MutexGuard<'_, Box<dyn MediaPlayer>> {
    player.lock().unwrap_or_else(|e| e.into_inner())
}

pub(super) struct MediaHandle {
    /// Load generation that built this session
    pub(super) generation: u64,
    /// Source with its open access grant
    pub(super) source: ResolvedSource,
    pub(super) player: SharedPlayer,
    pub(super) duration: f64,
    /// Position and rate observer tasks
    pub(super) observers: Vec<JoinHandle<()>>,
    /// Last position set by seek/pause, used for persistence snapshots
    pub(super) last_known_position: f64,
    /// Position at which the current play run started
    pub(super) playing_since: Option<f64>,
}

impl MediaHandle {
    pub(super) fn new(
        generation: u64,
        source: ResolvedSource,
        player: Box<dyn MediaPlayer>,
        duration: f64,
    ) -> Self {
        Self {
            generation,
            source,
            player: Arc::new(Mutex::new(player)),
            duration,
            observers: Vec::new(),
            last_known_position: 0.0,
            playing_since: None,
        }
    }

    /// Sanitized position sample, falling back to the last known position
    pub(super) fn position(&self) -> f64 {
        let raw = lock_player(&self.player).current_time();
        sanitize_seconds(raw).unwrap_or(self.last_known_position)
    }

    /// Clamp a seek target to the known duration
    pub(super) fn clamp_target(&self, seconds: f64) -> f64 {
        if self.duration > 0.0 {
            seconds.clamp(0.0, self.duration)
        } else {
            seconds.max(0.0)
        }
    }

    /// Stop playback, stop observers, then release access
    ///
    /// Observers are aborted and awaited before the grant is released so no
    /// tick can fire against a half-torn-down session.
    pub(super) async fn teardown(mut self) {
        lock_player(&self.player).pause();

        for observer in self.observers.drain(..) {
            observer.abort();
            let _ = observer.await;
        }

        lock_player(&self.player).set_audio_mix(None);
        self.source.release();
        self.playing_since = None;

        debug!(
            "Session torn down: generation={}, source={}",
            self.generation, self.source.token
        );
    }
}

impl Drop for MediaHandle {
    fn drop(&mut self) {
        for observer in self.observers.drain(..) {
            observer.abort();
        }
        self.source.release();
    }
}
