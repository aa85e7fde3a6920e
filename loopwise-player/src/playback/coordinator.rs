//! Practice session coordinator
//!
//! Consumes engine telemetry and turns it into UI events, loop-region seeks,
//! queue advancement, and persistence callbacks. All region and queue state
//! lives here; the engine only ever sees load/seek/play/pause calls.

use crate::error::{Error, Result};
use crate::media::SourceToken;
use crate::playback::engine::{PlaybackEngine, VolumeOutcome};
use crate::playback::events::EngineEvent;
use crate::playback::queue::PlaybackQueue;
use crate::playback::region::{LoopRegion, LoopRegionManager};
use crate::store::{PositionSnapshot, QueueSource, SessionStore};
use loopwise_common::events::{EventBus, PracticeEvent};
use loopwise_common::time::now;
use loopwise_common::{FileId, LoopMode, Segment, SegmentId};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Coordinator tuning
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Minimum spacing of periodic position snapshots
    pub snapshot_interval: Duration,
    /// UI event channel capacity
    pub event_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: Duration::from_millis(5000),
            event_capacity: 256,
        }
    }
}

pub struct PlaybackCoordinator {
    engine: Arc<PlaybackEngine>,
    region: LoopRegionManager,
    queue: PlaybackQueue,
    store: Arc<dyn SessionStore>,
    queue_source: Arc<dyn QueueSource>,
    bus: EventBus,
    telemetry: mpsc::UnboundedReceiver<EngineEvent>,

    active_file: Option<FileId>,
    duration: f64,
    position: f64,
    playing: bool,
    stopped: bool,

    snapshot_interval: Duration,
    last_snapshot: Option<Instant>,
}

impl PlaybackCoordinator {
    /// Create a coordinator; takes the engine's telemetry receiver
    pub fn new(
        engine: Arc<PlaybackEngine>,
        queue: PlaybackQueue,
        store: Arc<dyn SessionStore>,
        queue_source: Arc<dyn QueueSource>,
        config: CoordinatorConfig,
    ) -> Result<Self> {
        let telemetry = engine.take_event_receiver().ok_or_else(|| {
            Error::InvalidState("engine telemetry already has a consumer".to_string())
        })?;

        let mut coordinator = Self {
            engine,
            region: LoopRegionManager::new(),
            queue,
            store,
            queue_source,
            bus: EventBus::new(config.event_capacity),
            telemetry,
            active_file: None,
            duration: 0.0,
            position: 0.0,
            playing: false,
            stopped: false,
            snapshot_interval: config.snapshot_interval,
            last_snapshot: None,
        };
        coordinator.refresh_queue();
        Ok(coordinator)
    }

    /// Subscribe to UI events
    pub fn subscribe(&self) -> broadcast::Receiver<PracticeEvent> {
        self.bus.subscribe()
    }

    pub fn engine(&self) -> &Arc<PlaybackEngine> {
        &self.engine
    }

    pub fn active_file(&self) -> Option<&FileId> {
        self.active_file.as_ref()
    }

    /// Last position reported by the engine (or set by a seek here)
    pub fn last_position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// True once the queue ran out after a natural end
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn region(&self) -> LoopRegion {
        self.region.region()
    }

    pub fn segments(&self) -> Vec<Segment> {
        self.region.segments_for_display()
    }

    pub fn active_segment(&self) -> Option<&Segment> {
        self.region.active_segment()
    }

    pub fn queue(&self) -> &PlaybackQueue {
        &self.queue
    }

    // ========================================
    // Event loop
    // ========================================

    /// Process telemetry until `shutdown` resolves or the queue stops
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!("Coordinator event loop started");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                event = self.process_next_event() => {
                    if event.is_none() {
                        warn!("Engine telemetry closed");
                        break;
                    }
                    if self.stopped {
                        info!("Queue finished, stopping event loop");
                        break;
                    }
                }
            }
        }
    }

    /// Wait for and handle one telemetry event
    ///
    /// Events from superseded sessions are received and dropped.
    pub async fn process_next_event(&mut self) -> Option<EngineEvent> {
        let event = self.telemetry.recv().await?;

        if event.generation() != self.engine.generation() {
            debug!("Dropping stale {:?}", event);
            return Some(event);
        }

        self.handle_event(&event).await;
        Some(event)
    }

    async fn handle_event(&mut self, event: &EngineEvent) {
        match *event {
            EngineEvent::DurationResolved { duration, .. } => {
                self.duration = duration;
                if let Some(file) = self.active_file.clone() {
                    self.bus.emit_lossy(PracticeEvent::DurationResolved {
                        file,
                        duration,
                        timestamp: now(),
                    });
                }
            }
            EngineEvent::Ready { .. } => {
                if let Some(file) = self.active_file.clone() {
                    self.bus.emit_lossy(PracticeEvent::Ready {
                        file,
                        timestamp: now(),
                    });
                }
            }
            EngineEvent::PositionTick { position, .. } => {
                self.on_position(position).await;
            }
            EngineEvent::PlayingChanged { playing, .. } => {
                self.playing = playing;
                self.bus.emit_lossy(PracticeEvent::PlayingChanged {
                    playing,
                    timestamp: now(),
                });
                if !playing {
                    self.take_snapshot().await;
                }
            }
            EngineEvent::TrackEnded { .. } => {
                self.on_track_ended().await;
            }
        }
    }

    /// One sample drives both the time update and the boundary check
    async fn on_position(&mut self, position: f64) {
        self.position = position;
        self.bus.emit_lossy(PracticeEvent::TimeUpdate {
            position,
            duration: self.duration,
            timestamp: now(),
        });

        if let Some(target) = self.region.check_boundary(position) {
            self.engine.seek(target).await;
            self.position = target;
            debug!("Looped {:.3} -> {:.3}", position, target);
            self.bus.emit_lossy(PracticeEvent::Looped {
                from: position,
                to: target,
                timestamp: now(),
            });
        }

        let due = self
            .last_snapshot
            .map_or(true, |at| at.elapsed() >= self.snapshot_interval);
        if due {
            self.take_snapshot().await;
        }
    }

    async fn on_track_ended(&mut self) {
        self.playing = false;
        self.take_snapshot().await;

        let mode = self.queue.loop_mode();
        self.queue.set_current(self.active_file.clone());

        let next = if mode.advances_on_end() {
            self.queue.next_file()
        } else {
            None
        };

        let Some(next) = next else {
            info!("Track ended, nothing further to play (mode {})", mode);
            self.stop();
            return;
        };

        info!("Track ended, advancing to {} (mode {})", next, mode);
        match self.open_file(next, 0.0).await {
            Ok(true) => {
                self.engine.play().await;
            }
            Ok(false) => {}
            Err(_) => self.stop(),
        }
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.bus.emit_lossy(PracticeEvent::Stopped { timestamp: now() });
    }

    async fn take_snapshot(&mut self) {
        let Some(file) = self.active_file.clone() else {
            return;
        };
        let Some(snapshot) = self.engine.snapshot().await else {
            return;
        };

        self.store.position_snapshot(&PositionSnapshot {
            file,
            position: snapshot.position,
            duration: snapshot.duration,
            at: now(),
        });
        self.last_snapshot = Some(Instant::now());
    }

    // ========================================
    // File and queue control
    // ========================================

    /// Make `file` the active file and load it
    ///
    /// Returns `Ok(false)` when the load was superseded by another caller of
    /// the shared engine. Load failures are broadcast as `LoadFailed`.
    pub async fn open_file(&mut self, file: FileId, resume_time: f64) -> Result<bool> {
        if !self.queue.set_current(Some(file.clone())) {
            debug!("{} is not in the listing, opening anyway", file);
        }

        let segments = self.store.segments_for(&file);
        self.region.set_active_file(Some(file.clone()), segments);
        self.active_file = Some(file.clone());
        self.duration = 0.0;
        self.position = 0.0;
        self.playing = false;
        self.stopped = false;
        self.last_snapshot = None;

        self.bus.emit_lossy(PracticeEvent::FileChanged {
            file: file.clone(),
            timestamp: now(),
        });

        match self.engine.load(&SourceToken::from(&file), resume_time).await {
            Ok(Some(loaded)) => {
                self.duration = loaded.duration;
                self.position = self.engine.current_time().await;
                Ok(true)
            }
            Ok(None) => {
                debug!("Load of {} superseded", file);
                Ok(false)
            }
            Err(e) => {
                warn!("Failed to open {}: {}", file, e);
                self.bus.emit_lossy(PracticeEvent::LoadFailed {
                    file,
                    reason: e.to_string(),
                    timestamp: now(),
                });
                self.active_file = None;
                self.region.set_active_file(None, Vec::new());
                Err(e)
            }
        }
    }

    /// Manual forward arrow, following the loop mode
    pub async fn play_next(&mut self) -> Result<Option<FileId>> {
        self.queue.set_current(self.active_file.clone());
        let Some(next) = self.queue.next_file() else {
            return Ok(None);
        };
        self.switch_to(next).await
    }

    /// Manual back arrow, following the loop mode
    pub async fn play_previous(&mut self) -> Result<Option<FileId>> {
        self.queue.set_current(self.active_file.clone());
        let Some(previous) = self.queue.previous_file() else {
            return Ok(None);
        };
        self.switch_to(previous).await
    }

    async fn switch_to(&mut self, file: FileId) -> Result<Option<FileId>> {
        let was_playing = self.playing;
        if self.open_file(file.clone(), 0.0).await? && was_playing {
            self.engine.play().await;
        }
        Ok(Some(file))
    }

    /// Replace the listing
    pub fn update_queue(&mut self, files: Vec<FileId>) {
        self.queue.update_queue(files);
    }

    /// Pull the listing from the queue source
    pub fn refresh_queue(&mut self) {
        let files = self.queue_source.files();
        debug!("Queue refreshed: {} files", files.len());
        self.queue.update_queue(files);
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        if self.queue.loop_mode() == mode {
            return;
        }
        info!("Loop mode: {}", mode);
        self.queue.set_loop_mode(mode);
        self.bus.emit_lossy(PracticeEvent::LoopModeChanged {
            mode,
            timestamp: now(),
        });
    }

    // ========================================
    // Transport
    // ========================================

    pub async fn play(&mut self) -> bool {
        self.stopped = false;
        self.engine.play().await
    }

    pub async fn pause(&mut self) {
        self.engine.pause().await;
    }

    pub async fn seek(&mut self, time: f64) {
        self.engine.seek(time).await;
        self.position = self.engine.current_time().await;
    }

    pub async fn set_volume(&mut self, level: f32) -> VolumeOutcome {
        self.engine.set_volume(level).await
    }

    /// Final snapshot, then release the session
    pub async fn shutdown(&mut self) {
        self.take_snapshot().await;
        self.engine.teardown().await;
        info!("Coordinator shut down");
    }

    // ========================================
    // Region and segments
    // ========================================

    /// Set A at the current position
    pub async fn set_point_a(&mut self) -> bool {
        let position = self.engine.current_time().await;
        self.mark(|region| region.set_point_a(position))
    }

    /// Set B at the current position (sets A first when unset)
    pub async fn set_point_b(&mut self) -> bool {
        let position = self.engine.current_time().await;
        self.mark(|region| region.set_point_b(position))
    }

    /// Set A and B to explicit positions
    ///
    /// Returns false when B was rejected; A may still have moved.
    pub fn mark_region(&mut self, point_a: f64, point_b: f64) -> bool {
        if !self.mark(|region| region.set_point_a(point_a)) {
            return false;
        }
        self.mark(|region| region.set_point_b(point_b))
    }

    pub fn clear_region(&mut self) {
        self.region.clear();
        self.emit_region();
    }

    fn mark(&mut self, edit: impl FnOnce(&mut LoopRegionManager) -> bool) -> bool {
        let changed = edit(&mut self.region);
        if changed {
            self.emit_region();
        }
        changed
    }

    fn emit_region(&self) {
        let region = self.region.region();
        self.bus.emit_lossy(PracticeEvent::RegionChanged {
            point_a: region.point_a,
            point_b: region.point_b,
            timestamp: now(),
        });
    }

    /// Save the current region; a duplicate yields the existing segment
    pub fn save_segment(&mut self) -> Option<Segment> {
        let (segment, created) = self.region.save_current_segment()?;

        if created {
            self.store.segment_created(&segment);
            self.bus.emit_lossy(PracticeEvent::SegmentSaved {
                segment: segment.clone(),
                timestamp: now(),
            });
        } else {
            self.store.segment_selected(&segment.file, segment.id);
            self.bus.emit_lossy(PracticeEvent::SegmentSelected {
                segment_id: segment.id,
                timestamp: now(),
            });
        }
        Some(segment)
    }

    /// Loop a saved segment of the active file
    pub async fn apply_segment(&mut self, id: SegmentId, auto_play: bool) -> Option<Segment> {
        let segment = self.region.segments().iter().find(|s| s.id == id)?.clone();
        let playing = self.engine.is_playing().await;
        let jump = self.region.apply(&segment, auto_play, playing);

        self.engine.seek(jump.seek_to).await;
        self.position = jump.seek_to;
        if jump.start_playback {
            self.engine.play().await;
        }

        self.store.segment_selected(&segment.file, segment.id);
        self.bus.emit_lossy(PracticeEvent::SegmentSelected {
            segment_id: segment.id,
            timestamp: now(),
        });
        self.emit_region();
        Some(jump.segment)
    }

    pub async fn select_next_segment(&mut self, auto_play: bool) -> Option<Segment> {
        let target = self.region.select_next_segment()?;
        self.apply_segment(target.id, auto_play).await
    }

    pub async fn select_previous_segment(&mut self, auto_play: bool) -> Option<Segment> {
        let target = self.region.select_previous_segment()?;
        self.apply_segment(target.id, auto_play).await
    }

    pub fn remove_segment(&mut self, id: SegmentId) -> Option<Segment> {
        let removed = self.region.remove_segment(id)?;
        debug!("Removed {} from {}", removed.label, removed.file);
        Some(removed)
    }
}
