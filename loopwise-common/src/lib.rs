//! # Loopwise Common Library
//!
//! Shared code for the Loopwise practice player crates:
//! - Domain models (files, segments, loop modes)
//! - Event types (PracticeEvent enum) and the EventBus
//! - Configuration file discovery
//! - Time sanitation and human-readable formatting

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use models::{FileId, LoopMode, Segment, SegmentId};
