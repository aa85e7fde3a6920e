//! Persistence and listing collaborators
//!
//! The core never persists anything itself. A `SessionStore` is told about
//! segment and position changes; a `QueueSource` supplies the file listing.

use chrono::{DateTime, Utc};
use loopwise_common::{FileId, Segment, SegmentId};
use std::sync::RwLock;

/// Persisted resume point
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSnapshot {
    pub file: FileId,
    pub position: f64,
    pub duration: f64,
    pub at: DateTime<Utc>,
}

/// Persistence callbacks
///
/// Calls are made from the coordinator's event loop and must not block for
/// long; implementations that write to disk should hand off to a task.
pub trait SessionStore: Send + Sync {
    /// Segments previously saved for `file`
    fn segments_for(&self, file: &FileId) -> Vec<Segment>;

    fn segment_created(&self, segment: &Segment);

    fn segment_selected(&self, file: &FileId, segment: SegmentId);

    fn position_snapshot(&self, snapshot: &PositionSnapshot);
}

/// Store that keeps nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl SessionStore for NullStore {
    fn segments_for(&self, _file: &FileId) -> Vec<Segment> {
        Vec::new()
    }

    fn segment_created(&self, _segment: &Segment) {}

    fn segment_selected(&self, _file: &FileId, _segment: SegmentId) {}

    fn position_snapshot(&self, _snapshot: &PositionSnapshot) {}
}

/// Provider of the ordered file listing
pub trait QueueSource: Send + Sync {
    fn files(&self) -> Vec<FileId>;
}

/// Listing fixed at startup, replaceable at runtime
#[derive(Debug, Default)]
pub struct StaticQueueSource {
    files: RwLock<Vec<FileId>>,
}

impl StaticQueueSource {
    pub fn new(files: Vec<FileId>) -> Self {
        Self {
            files: RwLock::new(files),
        }
    }

    pub fn replace(&self, files: Vec<FileId>) {
        *self.files.write().unwrap_or_else(|e| e.into_inner()) = files;
    }
}

impl QueueSource for StaticQueueSource {
    fn files(&self) -> Vec<FileId> {
        self.files.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
