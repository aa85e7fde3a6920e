//! Error types for loopwise-player
//!
//! Region and queue operations never produce errors: invalid marker or save
//! requests are expected user-interaction states and come back as `None`.
//! Errors here are faults worth surfacing to the orchestrating layer.

use thiserror::Error;

/// Main error type for loopwise-player
#[derive(Error, Debug)]
pub enum Error {
    /// Source could not be opened or its access grant re-established
    #[error("Resource access failed for '{token}': {reason}")]
    ResourceAccess { token: String, reason: String },

    /// Media container could not be probed
    #[error("Media probe error: {0}")]
    Probe(String),

    /// Player construction or playback engine errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// Coordinator command issued in a state that cannot serve it
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from loopwise-common
    #[error(transparent)]
    Common(#[from] loopwise_common::Error),
}

impl Error {
    /// True for failures to open or authorize the underlying file
    pub fn is_resource_access(&self) -> bool {
        matches!(self, Error::ResourceAccess { .. })
    }
}

/// Convenience Result type using loopwise-player Error
pub type Result<T> = std::result::Result<T, Error>;
