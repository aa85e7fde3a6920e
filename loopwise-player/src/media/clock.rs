//! Software clock backend
//!
//! `ClockPlayer` renders nothing: its position advances with the tokio clock
//! while playing and it reports one completion when it reaches the probed
//! duration. It drives the headless runner and lets the rest of the core be
//! exercised end-to-end without an audio device.

use super::{
    probe, AudioMix, AudioTrack, MediaBackend, MediaPlayer, PlayerStatus, ResolvedSource,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

/// Backend pairing the symphonia probe with `ClockPlayer`
#[derive(Debug, Clone, Default)]
pub struct ClockBackend;

impl ClockBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaBackend for ClockBackend {
    async fn probe_duration(&self, locator: &Path) -> Result<f64> {
        let path = locator.to_path_buf();
        tokio::task::spawn_blocking(move || probe::probe_duration(&path))
            .await
            .map_err(|e| Error::Probe(format!("probe task failed: {}", e)))?
    }

    fn create_player(&self, source: &ResolvedSource, duration: f64) -> Result<Box<dyn MediaPlayer>> {
        if !source.has_access() {
            return Err(Error::Playback(format!(
                "source {} has no open access",
                source.token
            )));
        }
        Ok(Box::new(ClockPlayer::new(duration)))
    }

    async fn audio_track(&self, locator: &Path) -> Option<AudioTrack> {
        let path = locator.to_path_buf();
        match tokio::task::spawn_blocking(move || probe::probe_audio_track(&path)).await {
            Ok(Ok(track)) => track,
            Ok(Err(e)) => {
                debug!("Audio track lookup failed: {}", e);
                None
            }
            Err(e) => {
                warn!("Audio track lookup task failed: {}", e);
                None
            }
        }
    }
}

#[derive(Debug)]
struct ClockState {
    /// Position at `anchor`
    anchor_position: f64,
    /// Set while playing
    anchor: Option<Instant>,
    duration: f64,
    volume: f32,
    mix: Option<AudioMix>,
    /// Bumped on every play/pause/seek; stale end timers compare against it
    epoch: u64,
}

impl ClockState {
    fn position(&self) -> f64 {
        let position = match self.anchor {
            Some(anchor) => self.anchor_position + anchor.elapsed().as_secs_f64(),
            None => self.anchor_position,
        };
        if self.duration > 0.0 {
            position.min(self.duration)
        } else {
            position
        }
    }
}

/// Player whose position is a pure function of the tokio clock
pub struct ClockPlayer {
    state: Arc<Mutex<ClockState>>,
    status_tx: Arc<watch::Sender<PlayerStatus>>,
}

impl ClockPlayer {
    /// Create a paused player at position 0. A zero duration never completes.
    pub fn new(duration: f64) -> Self {
        let (status_tx, _) = watch::channel(PlayerStatus::default());
        Self {
            state: Arc::new(Mutex::new(ClockState {
                anchor_position: 0.0,
                anchor: None,
                duration,
                volume: 1.0,
                mix: None,
                epoch: 0,
            })),
            status_tx: Arc::new(status_tx),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Gain actually applied: direct volume times any track mix
    pub fn effective_gain(&self) -> f32 {
        let state = self.lock();
        state.volume * state.mix.as_ref().map(|m| m.gain).unwrap_or(1.0)
    }

    /// Schedule the natural end of the current play run
    fn schedule_end(&self, state: &ClockState) {
        if state.duration <= 0.0 {
            return;
        }
        let remaining = state.duration - state.anchor_position;
        if remaining <= 0.0 {
            return;
        }
        let remaining = match Duration::try_from_secs_f64(remaining) {
            Ok(remaining) => remaining,
            Err(e) => {
                warn!(
                    "Unusable track length {}s, end-of-track disabled: {}",
                    state.duration, e
                );
                return;
            }
        };
        let epoch = state.epoch;
        let shared = Arc::clone(&self.state);
        let status_tx = Arc::clone(&self.status_tx);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("ClockPlayer used outside a tokio runtime; end-of-track disabled");
            return;
        };

        handle.spawn(async move {
            tokio::time::sleep(remaining).await;
            let mut state = shared.lock().unwrap_or_else(|e| e.into_inner());
            if state.epoch != epoch || state.anchor.is_none() {
                return;
            }
            state.anchor_position = state.duration;
            state.anchor = None;
            state.epoch += 1;
            drop(state);

            status_tx.send_modify(|status| {
                status.rate = 0.0;
                status.completions += 1;
            });
        });
    }
}

impl MediaPlayer for ClockPlayer {
    fn play(&mut self) {
        let mut state = self.lock();
        if state.anchor.is_some() {
            return;
        }
        // Playing from the very end restarts from the top
        if state.duration > 0.0 && state.anchor_position >= state.duration {
            state.anchor_position = 0.0;
        }
        state.anchor = Some(Instant::now());
        state.epoch += 1;
        self.schedule_end(&state);
        drop(state);

        self.status_tx.send_modify(|status| status.rate = 1.0);
    }

    fn pause(&mut self) {
        let mut state = self.lock();
        if state.anchor.is_none() {
            return;
        }
        state.anchor_position = state.position();
        state.anchor = None;
        state.epoch += 1;
        drop(state);

        self.status_tx.send_modify(|status| status.rate = 0.0);
    }

    fn seek_exact(&mut self, seconds: f64) {
        let mut state = self.lock();
        let upper = if state.duration > 0.0 { state.duration } else { f64::MAX };
        state.anchor_position = seconds.clamp(0.0, upper);
        state.epoch += 1;
        if state.anchor.is_none() {
            return;
        }

        // Landing on the end stops the run without a natural completion
        if state.duration > 0.0 && state.anchor_position >= state.duration {
            state.anchor = None;
            drop(state);
            self.status_tx.send_modify(|status| status.rate = 0.0);
            return;
        }

        state.anchor = Some(Instant::now());
        self.schedule_end(&state);
    }

    fn current_time(&self) -> f64 {
        self.lock().position()
    }

    fn set_volume(&mut self, gain: f32) {
        self.lock().volume = gain.clamp(0.0, 1.0);
    }

    fn set_audio_mix(&mut self, mix: Option<AudioMix>) {
        self.lock().mix = mix;
    }

    fn status(&self) -> watch::Receiver<PlayerStatus> {
        self.status_tx.subscribe()
    }
}

impl Drop for ClockPlayer {
    fn drop(&mut self) {
        // Invalidate any pending end timer
        self.lock().epoch += 1;
    }
}
