//! Practice playback: engine, loop region, queue and their coordinator

pub mod coordinator;
pub mod engine;
pub mod events;
pub mod queue;
pub mod region;

pub use coordinator::{CoordinatorConfig, PlaybackCoordinator};
pub use engine::{EngineConfig, PlaybackEngine};
pub use events::EngineEvent;
pub use queue::PlaybackQueue;
pub use region::{LoopRegion, LoopRegionManager, SegmentJump};
