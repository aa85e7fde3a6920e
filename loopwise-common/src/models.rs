//! Domain models shared between the player core and its collaborators

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque identifier of a media file in the current listing
///
/// The core never interprets the contents; collaborators decide whether it is
/// a path, a bookmark key, or a database id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FileId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Segment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(Uuid);

impl SegmentId {
    /// Generate a new random segment id
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A saved A-B region of a file
///
/// `end_time > start_time` always holds for segments created by the core.
/// `index` is a dense ordinal within the owning file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub label: String,
    pub start_time: f64,
    pub end_time: f64,
    pub index: u32,
    pub file: FileId,
    pub created_at: DateTime<Utc>,
}

impl Segment {
    /// True if this segment covers exactly the given bounds
    pub fn has_bounds(&self, start_time: f64, end_time: f64) -> bool {
        self.start_time == start_time && self.end_time == end_time
    }
}

/// Repeat policy for advancing through the file listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoopMode {
    /// No automatic or manual advancement
    #[default]
    Off,
    /// Stay on the active file
    RepeatOne,
    /// Advance circularly, starting from the first file when none is current
    RepeatAll,
    /// Random file other than the current one
    Shuffle,
    /// Advance circularly, only from a resolvable current file
    AutoPlayNext,
}

impl LoopMode {
    /// Every mode, in UI order
    pub const ALL: [LoopMode; 5] = [
        LoopMode::Off,
        LoopMode::RepeatOne,
        LoopMode::RepeatAll,
        LoopMode::Shuffle,
        LoopMode::AutoPlayNext,
    ];

    /// Whether natural end-of-track should consult the queue
    pub fn advances_on_end(self) -> bool {
        matches!(
            self,
            LoopMode::RepeatAll | LoopMode::Shuffle | LoopMode::AutoPlayNext
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoopMode::Off => "off",
            LoopMode::RepeatOne => "repeat-one",
            LoopMode::RepeatAll => "repeat-all",
            LoopMode::Shuffle => "shuffle",
            LoopMode::AutoPlayNext => "auto-play-next",
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoopMode {
    type Err = Error;

    /// Accepts kebab-case, snake_case and camelCase spellings
    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize_mode_name(s);
        LoopMode::ALL
            .into_iter()
            .find(|mode| normalize_mode_name(mode.as_str()) == wanted)
            .ok_or_else(|| Error::InvalidInput(format!("unknown loop mode '{}'", s)))
    }
}

fn normalize_mode_name(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect::<String>()
        .to_ascii_lowercase()
}
