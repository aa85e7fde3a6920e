//! Volume planning
//!
//! The player primitive caps direct gain at unity. Levels above unity are
//! realized as unity direct gain plus an `AudioMix` boost on the audio track.

/// How a requested level maps onto the player
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumePlan {
    /// Direct gain, no mix
    Direct(f32),
    /// Unity direct gain plus a track mix at this gain
    Boost(f32),
}

impl VolumePlan {
    /// Plan a level, clamped to `[0, max_boost]`. Non-finite levels are rejected.
    pub fn for_level(level: f32, max_boost: f32) -> Option<Self> {
        if !level.is_finite() {
            return None;
        }
        let level = level.clamp(0.0, max_boost.max(1.0));
        if level <= 1.0 {
            Some(VolumePlan::Direct(level))
        } else {
            Some(VolumePlan::Boost(level))
        }
    }

    pub fn level(&self) -> f32 {
        match *self {
            VolumePlan::Direct(level) | VolumePlan::Boost(level) => level,
        }
    }
}

/// What `PlaybackEngine::set_volume` ended up doing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeOutcome {
    /// No session; the level is remembered for the next load
    NoSession,
    /// Non-finite level ignored
    Rejected,
    Direct(f32),
    Boosted(f32),
    /// No audio track could be resolved; playback continues at unity
    BoostUnavailable,
    /// Session was replaced during the track lookup
    Superseded,
}
