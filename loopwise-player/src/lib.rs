//! # Loopwise Player Library (loopwise-player)
//!
//! Practice player core: one media session at a time, A-B loop regions with
//! saved segments, and loop-mode queue navigation.
//!
//! **Architecture:** `PlaybackEngine` owns the media session and emits
//! telemetry over an mpsc channel; `PlaybackCoordinator` consumes it, drives
//! the loop region and queue, and broadcasts `PracticeEvent`s.

pub mod config;
pub mod error;
pub mod media;
pub mod playback;
pub mod store;

pub use error::{Error, Result};
