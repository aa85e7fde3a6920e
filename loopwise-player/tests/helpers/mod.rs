//! Test helper modules for Loopwise player integration tests
//!
//! Provides controllable stand-ins for every collaborator of the core:
//! - FakeResolver: counts opened and released access grants, can deny tokens
//! - FakeBackend: scripted durations, probe gates, construction barriers,
//!   player registry
//! - FakePlayerHandle: drive position, completion and inspect calls
//! - RecordingStore: records persistence callbacks

#![allow(dead_code)]

use async_trait::async_trait;
use loopwise_common::{FileId, Segment, SegmentId};
use loopwise_player::error::{Error, Result};
use loopwise_player::media::{
    AccessGrant, AudioMix, AudioTrack, MediaBackend, MediaPlayer, PlayerStatus, ResolvedSource,
    SourceResolver, SourceToken,
};
use loopwise_player::store::{PositionSnapshot, SessionStore};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use tokio::sync::{watch, Notify};

// ============================================================================
// Resolver
// ============================================================================

#[derive(Debug)]
struct FakeGrant {
    released: Arc<AtomicUsize>,
}

impl AccessGrant for FakeGrant {}

impl Drop for FakeGrant {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Resolver whose locator is the token itself
#[derive(Default)]
pub struct FakeResolver {
    opened: AtomicUsize,
    released: Arc<AtomicUsize>,
    denied: Mutex<HashSet<String>>,
}

impl FakeResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make resolving `token` fail with a resource access error
    pub fn deny(&self, token: &str) {
        self.denied.lock().unwrap().insert(token.to_string());
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Grants opened and not yet released
    pub fn outstanding(&self) -> usize {
        self.opened() - self.released()
    }
}

impl SourceResolver for FakeResolver {
    fn resolve(&self, token: &SourceToken) -> Result<ResolvedSource> {
        if self.denied.lock().unwrap().contains(token.as_str()) {
            return Err(Error::ResourceAccess {
                token: token.to_string(),
                reason: "access denied".to_string(),
            });
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(ResolvedSource::new(
            token.clone(),
            PathBuf::from(token.as_str()),
            Box::new(FakeGrant {
                released: Arc::clone(&self.released),
            }),
        ))
    }
}

// ============================================================================
// Player
// ============================================================================

#[derive(Debug, Default)]
struct FakePlayerState {
    position: f64,
    volume: f32,
    mix: Option<AudioMix>,
    seeks: Vec<f64>,
    plays: usize,
    pauses: usize,
}

/// Test-side handle onto a player created by `FakeBackend`
#[derive(Clone)]
pub struct FakePlayerHandle {
    pub locator: PathBuf,
    state: Arc<Mutex<FakePlayerState>>,
    status_tx: Arc<watch::Sender<PlayerStatus>>,
}

impl FakePlayerHandle {
    fn new(locator: PathBuf) -> Self {
        let (status_tx, _) = watch::channel(PlayerStatus::default());
        Self {
            locator,
            state: Arc::new(Mutex::new(FakePlayerState {
                volume: 1.0,
                ..Default::default()
            })),
            status_tx: Arc::new(status_tx),
        }
    }

    /// Move the playhead as if media had played up to `seconds`
    pub fn set_position(&self, seconds: f64) {
        self.state.lock().unwrap().position = seconds;
    }

    pub fn position(&self) -> f64 {
        self.state.lock().unwrap().position
    }

    /// Report a natural end of track
    pub fn finish(&self) {
        self.status_tx.send_modify(|status| {
            status.rate = 0.0;
            status.completions += 1;
        });
    }

    /// Report a player failure (rate stays, but playback is not happening)
    pub fn fail(&self) {
        self.status_tx.send_modify(|status| status.failed = true);
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.state.lock().unwrap().seeks.clone()
    }

    pub fn plays(&self) -> usize {
        self.state.lock().unwrap().plays
    }

    pub fn pauses(&self) -> usize {
        self.state.lock().unwrap().pauses
    }

    pub fn volume(&self) -> f32 {
        self.state.lock().unwrap().volume
    }

    pub fn mix(&self) -> Option<AudioMix> {
        self.state.lock().unwrap().mix
    }
}

struct FakePlayer {
    handle: FakePlayerHandle,
}

impl MediaPlayer for FakePlayer {
    fn play(&mut self) {
        self.handle.state.lock().unwrap().plays += 1;
        self.handle.status_tx.send_modify(|status| status.rate = 1.0);
    }

    fn pause(&mut self) {
        self.handle.state.lock().unwrap().pauses += 1;
        self.handle.status_tx.send_modify(|status| status.rate = 0.0);
    }

    fn seek_exact(&mut self, seconds: f64) {
        let mut state = self.handle.state.lock().unwrap();
        state.position = seconds;
        state.seeks.push(seconds);
    }

    fn current_time(&self) -> f64 {
        self.handle.position()
    }

    fn set_volume(&mut self, gain: f32) {
        self.handle.state.lock().unwrap().volume = gain;
    }

    fn set_audio_mix(&mut self, mix: Option<AudioMix>) {
        self.handle.state.lock().unwrap().mix = mix;
    }

    fn status(&self) -> watch::Receiver<PlayerStatus> {
        self.handle.status_tx.subscribe()
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Backend with scripted durations and a registry of created players
pub struct FakeBackend {
    durations: Mutex<HashMap<PathBuf, std::result::Result<f64, String>>>,
    default_duration: f64,
    gates: Mutex<HashMap<PathBuf, Arc<Notify>>>,
    builds: Mutex<HashMap<PathBuf, Arc<Barrier>>>,
    players: Mutex<Vec<FakePlayerHandle>>,
    has_audio_track: AtomicBool,
}

impl FakeBackend {
    /// Every source probes to `default_duration` unless scripted otherwise
    pub fn new(default_duration: f64) -> Arc<Self> {
        Arc::new(Self {
            durations: Mutex::new(HashMap::new()),
            default_duration,
            gates: Mutex::new(HashMap::new()),
            builds: Mutex::new(HashMap::new()),
            players: Mutex::new(Vec::new()),
            has_audio_track: AtomicBool::new(true),
        })
    }

    pub fn set_duration(&self, locator: &str, duration: f64) {
        self.durations
            .lock()
            .unwrap()
            .insert(PathBuf::from(locator), Ok(duration));
    }

    pub fn fail_duration(&self, locator: &str) {
        self.durations
            .lock()
            .unwrap()
            .insert(PathBuf::from(locator), Err("no duration".to_string()));
    }

    /// Hold probes of `locator` until the returned gate is notified
    pub fn gate(&self, locator: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(PathBuf::from(locator), Arc::clone(&gate));
        gate
    }

    /// Block player construction for `locator` on a two-party barrier
    ///
    /// `create_player` waits on the barrier twice: once when construction
    /// starts and once more before it returns.
    pub fn hold_construction(&self, locator: &str) -> Arc<Barrier> {
        let barrier = Arc::new(Barrier::new(2));
        self.builds
            .lock()
            .unwrap()
            .insert(PathBuf::from(locator), Arc::clone(&barrier));
        barrier
    }

    pub fn set_audio_track(&self, present: bool) {
        self.has_audio_track.store(present, Ordering::SeqCst);
    }

    pub fn players(&self) -> Vec<FakePlayerHandle> {
        self.players.lock().unwrap().clone()
    }

    pub fn last_player(&self) -> FakePlayerHandle {
        self.players
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no player created yet")
    }
}

#[async_trait]
impl MediaBackend for FakeBackend {
    async fn probe_duration(&self, locator: &Path) -> Result<f64> {
        let gate = self.gates.lock().unwrap().get(locator).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match self.durations.lock().unwrap().get(locator) {
            Some(Ok(duration)) => Ok(*duration),
            Some(Err(reason)) => Err(Error::Probe(reason.clone())),
            None => Ok(self.default_duration),
        }
    }

    fn create_player(
        &self,
        source: &ResolvedSource,
        _duration: f64,
    ) -> Result<Box<dyn MediaPlayer>> {
        let build = self.builds.lock().unwrap().get(&source.locator).cloned();
        if let Some(build) = build {
            build.wait();
            build.wait();
        }

        let handle = FakePlayerHandle::new(source.locator.clone());
        self.players.lock().unwrap().push(handle.clone());
        Ok(Box::new(FakePlayer { handle }))
    }

    async fn audio_track(&self, _locator: &Path) -> Option<AudioTrack> {
        self.has_audio_track.load(Ordering::SeqCst).then_some(AudioTrack {
            id: 1,
            channels: Some(2),
            sample_rate: Some(44100),
        })
    }
}

// ============================================================================
// Store
// ============================================================================

/// Store that records every callback
#[derive(Default)]
pub struct RecordingStore {
    persisted: Mutex<HashMap<FileId, Vec<Segment>>>,
    pub created: Mutex<Vec<Segment>>,
    pub selected: Mutex<Vec<(FileId, SegmentId)>>,
    pub snapshots: Mutex<Vec<PositionSnapshot>>,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_segments(file: &str, segments: Vec<Segment>) -> Arc<Self> {
        let store = Self::default();
        store
            .persisted
            .lock()
            .unwrap()
            .insert(FileId::from(file), segments);
        Arc::new(store)
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.lock().unwrap().len()
    }

    pub fn snapshots(&self) -> Vec<PositionSnapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl SessionStore for RecordingStore {
    fn segments_for(&self, file: &FileId) -> Vec<Segment> {
        self.persisted
            .lock()
            .unwrap()
            .get(file)
            .cloned()
            .unwrap_or_default()
    }

    fn segment_created(&self, segment: &Segment) {
        self.created.lock().unwrap().push(segment.clone());
    }

    fn segment_selected(&self, file: &FileId, segment: SegmentId) {
        self.selected.lock().unwrap().push((file.clone(), segment));
    }

    fn position_snapshot(&self, snapshot: &PositionSnapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }
}
