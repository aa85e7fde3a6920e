//! Playback engine module
//!
//! **Module Structure:**
//! - `core.rs`: PlaybackEngine, load/teardown lifecycle and transport control
//! - `session.rs`: MediaHandle, the single active session and its teardown
//! - `observers.rs`: position and rate observer tasks
//! - `volume.rs`: direct gain vs gain-boost mix planning

mod core;
mod observers;
mod session;
mod volume;

pub use self::core::{EngineConfig, EngineSnapshot, LoadedSession, PlaybackEngine};
pub use self::volume::{VolumeOutcome, VolumePlan};
