//! Media collaborator interfaces and the shipped backends
//!
//! The playback engine never touches files or decoders directly. It talks to:
//! - a [`SourceResolver`] turning an opaque [`SourceToken`] into an
//!   access-granted [`ResolvedSource`]
//! - a [`MediaBackend`] probing durations/tracks and constructing players
//! - the [`MediaPlayer`] instances it creates
//!
//! Shipped implementations: [`fs::FsSourceResolver`], [`clock::ClockBackend`]
//! (software clock player) and the `symphonia` probe in [`probe`].

pub mod clock;
pub mod fs;
pub mod probe;

use crate::error::Result;
use async_trait::async_trait;
use loopwise_common::FileId;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

pub use clock::{ClockBackend, ClockPlayer};
pub use fs::FsSourceResolver;

/// Opaque token identifying a media source (path, bookmark, store key)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceToken(String);

impl SourceToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&FileId> for SourceToken {
    fn from(file: &FileId) -> Self {
        Self(file.as_str().to_string())
    }
}

impl From<&str> for SourceToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Proof of open access to a source
///
/// Dropping the grant releases the access. Implementations do their release
/// work in `Drop`, so a grant can only ever be released once.
pub trait AccessGrant: Send + Sync + fmt::Debug {}

/// A source whose access has been granted
#[derive(Debug)]
pub struct ResolvedSource {
    pub token: SourceToken,
    pub locator: PathBuf,
    grant: Option<Box<dyn AccessGrant>>,
}

impl ResolvedSource {
    pub fn new(token: SourceToken, locator: PathBuf, grant: Box<dyn AccessGrant>) -> Self {
        Self {
            token,
            locator,
            grant: Some(grant),
        }
    }

    /// Whether the access grant is still held
    pub fn has_access(&self) -> bool {
        self.grant.is_some()
    }

    /// Release the access grant (idempotent)
    pub fn release(&mut self) {
        if let Some(grant) = self.grant.take() {
            drop(grant);
        }
    }
}

/// Resolves source tokens into access-granted sources
pub trait SourceResolver: Send + Sync {
    /// Fails with `Error::ResourceAccess` when access cannot be (re-)established
    fn resolve(&self, token: &SourceToken) -> Result<ResolvedSource>;
}

/// Snapshot of a player's observable state
///
/// `completions` increments exactly once per natural end-of-track; pauses at
/// the end or seeks to the end do not count.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerStatus {
    pub rate: f32,
    pub failed: bool,
    pub completions: u64,
}

impl PlayerStatus {
    pub fn is_playing(&self) -> bool {
        self.rate != 0.0 && !self.failed
    }
}

/// Audio track description returned by the backend's track lookup
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub id: u32,
    pub channels: Option<usize>,
    pub sample_rate: Option<u32>,
}

/// Gain applied to one audio track, used for volume above unity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioMix {
    pub track_id: u32,
    pub gain: f32,
}

/// One decoder/renderer instance
///
/// Methods are synchronous relative to the player; the engine serializes
/// every call.
pub trait MediaPlayer: Send {
    fn play(&mut self);

    fn pause(&mut self);

    /// Reposition with zero tolerance
    fn seek_exact(&mut self, seconds: f64);

    /// Raw position sample; callers sanitize before use
    fn current_time(&self) -> f64;

    /// Direct gain, capped at unity by the primitive
    fn set_volume(&mut self, gain: f32);

    /// Install or remove a per-track gain mix
    fn set_audio_mix(&mut self, mix: Option<AudioMix>);

    /// Status feed; changes are pushed by the player
    fn status(&self) -> watch::Receiver<PlayerStatus>;
}

/// Platform media service: probing and player construction
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Resolve media duration in seconds (may take arbitrary time)
    async fn probe_duration(&self, locator: &Path) -> Result<f64>;

    /// Construct a player for an access-granted source
    fn create_player(&self, source: &ResolvedSource, duration: f64) -> Result<Box<dyn MediaPlayer>>;

    /// Look up the first audio track, if any
    async fn audio_track(&self, locator: &Path) -> Option<AudioTrack>;
}
