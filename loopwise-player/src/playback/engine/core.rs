//! Core playback engine - session lifecycle and transport control
//!
//! **Responsibilities:**
//! - PlaybackEngine struct definition and initialization
//! - Load with generation-based cancellation
//! - Transport control (play, pause, seek, volume)
//! - Idempotent teardown
//!
//! All session mutations go through one `tokio::sync::Mutex`. `load` drops
//! the lock while the duration resolves so a newer `load` can supersede it;
//! the generation counter is compared at two checkpoints and once more under
//! the lock before a session is installed.

use super::observers::{spawn_position_observer, spawn_rate_observer};
use super::session::{lock_player, MediaHandle};
use super::volume::{VolumeOutcome, VolumePlan};
use crate::error::Result;
use crate::media::{AudioMix, MediaBackend, SourceResolver, SourceToken};
use crate::playback::events::EngineEvent;
use loopwise_common::time::{duration_or_zero, sanitize_seconds};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// Engine tuning
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Position observer cadence
    pub tick_interval: Duration,
    /// Highest accepted volume level (1.0 = unity)
    pub max_volume_boost: f32,
    /// Volume applied to each new session
    pub initial_volume: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            max_volume_boost: 2.0,
            initial_volume: 1.0,
        }
    }
}

/// Result of a load that won its race
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSession {
    pub generation: u64,
    pub token: SourceToken,
    pub locator: PathBuf,
    pub duration: f64,
}

/// Position snapshot for persistence
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub token: SourceToken,
    pub position: f64,
    pub duration: f64,
    pub playing: bool,
}

/// Playback engine - owns exactly one media session
pub struct PlaybackEngine {
    resolver: Arc<dyn SourceResolver>,
    backend: Arc<dyn MediaBackend>,

    /// The active session (None when torn down)
    session: Mutex<Option<MediaHandle>>,

    /// Monotonic load generation; the latest minted value is current
    load_token: AtomicU64,

    /// Requested volume level, re-applied on every load
    volume: std::sync::Mutex<f32>,

    /// Telemetry channel sender
    event_tx: mpsc::UnboundedSender<EngineEvent>,

    /// Telemetry channel receiver, taken once by the coordinator
    event_rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<EngineEvent>>>,

    config: EngineConfig,
}

impl PlaybackEngine {
    /// Create new playback engine
    pub fn new(
        resolver: Arc<dyn SourceResolver>,
        backend: Arc<dyn MediaBackend>,
        config: EngineConfig,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        info!(
            "Creating playback engine (tick interval {}ms, max volume {:.2})",
            config.tick_interval.as_millis(),
            config.max_volume_boost
        );
        Self {
            resolver,
            backend,
            session: Mutex::new(None),
            load_token: AtomicU64::new(0),
            volume: std::sync::Mutex::new(config.initial_volume),
            event_tx,
            event_rx: std::sync::Mutex::new(Some(event_rx)),
            config,
        }
    }

    /// Take the telemetry receiver (only one consumer allowed)
    pub fn take_event_receiver(&self) -> Option<mpsc::UnboundedReceiver<EngineEvent>> {
        self.event_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    /// Generation of the most recent load or teardown
    pub fn generation(&self) -> u64 {
        self.load_token.load(Ordering::SeqCst)
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.generation() != generation
    }

    fn emit(&self, event: EngineEvent) {
        // No receiver is fine: telemetry is best-effort
        let _ = self.event_tx.send(event);
    }

    /// Load a source, superseding any session or load in progress
    ///
    /// Returns `Ok(None)` when a newer `load` (or `teardown`) won the race;
    /// the stale load's opened access has been released by then.
    /// Returns `Err(Error::ResourceAccess)` when the source cannot be opened;
    /// the engine is left torn down.
    pub async fn load(
        &self,
        token: &SourceToken,
        resume_time: f64,
    ) -> Result<Option<LoadedSession>> {
        let generation = self.load_token.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Load requested: source={}, generation={}", token, generation);

        self.teardown_session().await;

        let mut source = match self.resolver.resolve(token) {
            Ok(source) => source,
            Err(e) => {
                warn!("Cannot open {}: {}", token, e);
                return Err(e);
            }
        };

        let duration = match self.backend.probe_duration(&source.locator).await {
            Ok(raw) => {
                let duration = duration_or_zero(raw);
                if duration != raw {
                    warn!("Unusable duration {} for {}, using 0", raw, token);
                }
                duration
            }
            Err(e) => {
                warn!("Duration unavailable for {}: {}", token, e);
                0.0
            }
        };

        // Checkpoint 1: superseded while resolving duration
        if self.is_superseded(generation) {
            debug!("Load of {} superseded after duration (generation {})", token, generation);
            source.release();
            return Ok(None);
        }

        self.emit(EngineEvent::DurationResolved { generation, duration });

        let player = match self.backend.create_player(&source, duration) {
            Ok(player) => player,
            Err(e) => {
                warn!("Player construction failed for {}: {}", token, e);
                source.release();
                return Err(e);
            }
        };
        let mut handle = MediaHandle::new(generation, source, player, duration);

        self.emit(EngineEvent::Ready { generation });

        // Checkpoint 2: superseded while the player was being built
        if self.is_superseded(generation) {
            debug!("Load of {} superseded after ready (generation {})", token, generation);
            handle.teardown().await;
            return Ok(None);
        }

        let mut session = self.session.lock().await;

        // A newer load may have run its teardown between checkpoint 2 and here
        if self.is_superseded(generation) {
            drop(session);
            debug!("Load of {} superseded before install (generation {})", token, generation);
            handle.teardown().await;
            return Ok(None);
        }

        if let Some(resume) = sanitize_seconds(resume_time).filter(|t| *t > 0.0) {
            let target = handle.clamp_target(resume);
            lock_player(&handle.player).seek_exact(target);
            handle.last_known_position = target;
            debug!("Resumed {} at {:.3}s", token, target);
        }

        let status_rx = lock_player(&handle.player).status();
        handle.observers.push(spawn_position_observer(
            generation,
            Arc::clone(&handle.player),
            self.config.tick_interval,
            self.event_tx.clone(),
        ));
        handle
            .observers
            .push(spawn_rate_observer(generation, status_rx, self.event_tx.clone()));

        let loaded = LoadedSession {
            generation,
            token: handle.source.token.clone(),
            locator: handle.source.locator.clone(),
            duration,
        };
        *session = Some(handle);
        drop(session);

        let level = *self.volume.lock().unwrap_or_else(|e| e.into_inner());
        self.set_volume(level).await;

        info!(
            "Loaded {} (duration {:.3}s, generation {})",
            loaded.token, loaded.duration, generation
        );
        Ok(Some(loaded))
    }

    /// Start playback; returns whether a session was present
    pub async fn play(&self) -> bool {
        let mut session = self.session.lock().await;
        let Some(handle) = session.as_mut() else {
            debug!("Play ignored: no session");
            return false;
        };

        let position = handle.position();
        lock_player(&handle.player).play();
        handle.playing_since = Some(position);
        debug!("Play at {:.3}s", position);
        true
    }

    pub async fn pause(&self) {
        let mut session = self.session.lock().await;
        let Some(handle) = session.as_mut() else {
            return;
        };

        lock_player(&handle.player).pause();
        handle.last_known_position = handle.position();
        handle.playing_since = None;
        debug!("Pause at {:.3}s", handle.last_known_position);
    }

    /// Reposition with exact tolerance
    ///
    /// Non-finite or negative targets are discarded.
    pub async fn seek(&self, time: f64) {
        let Some(time) = sanitize_seconds(time) else {
            debug!("Seek ignored: unusable target {}", time);
            return;
        };

        let mut session = self.session.lock().await;
        let Some(handle) = session.as_mut() else {
            return;
        };

        let target = handle.clamp_target(time);
        lock_player(&handle.player).seek_exact(target);
        handle.last_known_position = target;
    }

    /// Seek relative to the current position
    pub async fn skip_by(&self, delta: f64) -> Option<f64> {
        if !delta.is_finite() {
            return None;
        }
        let mut session = self.session.lock().await;
        let handle = session.as_mut()?;

        let target = handle.clamp_target(handle.position() + delta);
        lock_player(&handle.player).seek_exact(target);
        handle.last_known_position = target;
        Some(target)
    }

    /// Set the output level; above unity requires a track gain mix
    pub async fn set_volume(&self, level: f32) -> VolumeOutcome {
        let Some(plan) = VolumePlan::for_level(level, self.config.max_volume_boost) else {
            debug!("Volume ignored: unusable level {}", level);
            return VolumeOutcome::Rejected;
        };
        *self.volume.lock().unwrap_or_else(|e| e.into_inner()) = plan.level();

        let (generation, locator) = {
            let mut session = self.session.lock().await;
            let Some(handle) = session.as_mut() else {
                return VolumeOutcome::NoSession;
            };

            match plan {
                VolumePlan::Direct(gain) => {
                    let mut player = lock_player(&handle.player);
                    player.set_audio_mix(None);
                    player.set_volume(gain);
                    return VolumeOutcome::Direct(gain);
                }
                VolumePlan::Boost(_) => (handle.generation, handle.source.locator.clone()),
            }
        };

        // Track lookup runs without the session lock
        let track = self.backend.audio_track(&locator).await;

        let mut session = self.session.lock().await;
        let Some(handle) = session.as_mut().filter(|h| h.generation == generation) else {
            debug!("Volume boost dropped: session replaced during track lookup");
            return VolumeOutcome::Superseded;
        };

        let mut player = lock_player(&handle.player);
        player.set_volume(1.0);
        match track {
            Some(track) => {
                let gain = plan.level();
                player.set_audio_mix(Some(AudioMix {
                    track_id: track.id,
                    gain,
                }));
                debug!("Volume boost {:.2} on track {}", gain, track.id);
                VolumeOutcome::Boosted(gain)
            }
            None => {
                player.set_audio_mix(None);
                debug!("No audio track resolvable, volume boost skipped");
                VolumeOutcome::BoostUnavailable
            }
        }
    }

    /// Requested volume level
    pub fn volume(&self) -> f32 {
        *self.volume.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Tear down the session and cancel any load in progress
    ///
    /// Safe to call repeatedly and when nothing was ever loaded.
    pub async fn teardown(&self) {
        self.load_token.fetch_add(1, Ordering::SeqCst);
        self.teardown_session().await;
    }

    async fn teardown_session(&self) {
        let mut session = self.session.lock().await;
        if let Some(handle) = session.take() {
            // Completes before the slot is observed as empty by any caller
            handle.teardown().await;
        }
    }

    // ========================================
    // Accessors
    // ========================================

    pub async fn is_loaded(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Current sanitized position (0.0 without a session)
    pub async fn current_time(&self) -> f64 {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|h| h.position())
            .unwrap_or(0.0)
    }

    pub async fn duration(&self) -> f64 {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|h| h.duration)
            .unwrap_or(0.0)
    }

    pub async fn current_source(&self) -> Option<SourceToken> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|h| h.source.token.clone())
    }

    /// Whether the active session still holds its access grant
    pub async fn has_access_open(&self) -> bool {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|h| h.source.has_access())
            .unwrap_or(false)
    }

    /// Position at which the current play run started
    pub async fn playing_since(&self) -> Option<f64> {
        self.session.lock().await.as_ref().and_then(|h| h.playing_since)
    }

    /// Whether the player currently reports playback, ahead of any telemetry
    pub async fn is_playing(&self) -> bool {
        self.session
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| lock_player(&h.player).status().borrow().is_playing())
    }

    /// Snapshot for persistence; refreshes the last known position
    pub async fn snapshot(&self) -> Option<EngineSnapshot> {
        let mut session = self.session.lock().await;
        let handle = session.as_mut()?;

        handle.last_known_position = handle.position();
        let playing = lock_player(&handle.player).status().borrow().is_playing();
        Some(EngineSnapshot {
            token: handle.source.token.clone(),
            position: handle.last_known_position,
            duration: handle.duration,
            playing,
        })
    }
}
