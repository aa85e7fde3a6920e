//! A-B loop region and saved segments for the active file
//!
//! Pure state; no engine calls. The coordinator feeds in position samples and
//! acts on the seek targets returned here.
//!
//! ```text
//! A-unset --set_point_a--> A-set --set_point_b (now > A)--> A-and-B-set
//!    |                                                          |
//!    +-------------------set_point_b (auto A)-------------------+
//! ```

use loopwise_common::time::{now, sanitize_seconds};
use loopwise_common::{FileId, Segment, SegmentId};
use std::cmp::Ordering;
use tracing::debug;

/// Current A/B markers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopRegion {
    pub point_a: Option<f64>,
    pub point_b: Option<f64>,
}

impl LoopRegion {
    pub fn is_complete(&self) -> bool {
        self.bounds().is_some()
    }

    /// `(A, B)` when both are set
    pub fn bounds(&self) -> Option<(f64, f64)> {
        match (self.point_a, self.point_b) {
            (Some(a), Some(b)) if b > a => Some((a, b)),
            _ => None,
        }
    }
}

/// What applying a segment asks the caller to do
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentJump {
    pub segment: Segment,
    pub seek_to: f64,
    pub start_playback: bool,
}

/// Region state machine plus the active file's segment list
#[derive(Debug, Default)]
pub struct LoopRegionManager {
    region: LoopRegion,
    active_file: Option<FileId>,
    segments: Vec<Segment>,
    active_segment: Option<SegmentId>,
    /// Next index to assign; never decreases for the active file
    next_index: u32,
}

impl LoopRegionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to a new active file, resetting the region
    pub fn set_active_file(&mut self, file: Option<FileId>, segments: Vec<Segment>) {
        self.region = LoopRegion::default();
        self.active_segment = None;
        self.next_index = segments.iter().map(|s| s.index + 1).max().unwrap_or(0);
        self.segments = segments;
        self.active_file = file;
    }

    pub fn active_file(&self) -> Option<&FileId> {
        self.active_file.as_ref()
    }

    pub fn region(&self) -> LoopRegion {
        self.region
    }

    pub fn active_segment(&self) -> Option<&Segment> {
        let id = self.active_segment?;
        self.segments.iter().find(|s| s.id == id)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Set A; B is cleared when it no longer lies after A
    pub fn set_point_a(&mut self, now: f64) -> bool {
        let Some(now) = sanitize_seconds(now) else {
            return false;
        };
        self.region.point_a = Some(now);
        if matches!(self.region.point_b, Some(b) if b <= now) {
            self.region.point_b = None;
        }
        true
    }

    /// Set B; sets A first when unset, ignored when `now <= A`
    pub fn set_point_b(&mut self, now: f64) -> bool {
        let Some(now) = sanitize_seconds(now) else {
            return false;
        };
        match self.region.point_a {
            None => {
                // One-gesture flow: A lands here, B waits for a later press
                self.region.point_a = Some(now);
                true
            }
            Some(a) if now <= a => {
                debug!("Point B {:.3} not after A {:.3}, ignored", now, a);
                false
            }
            Some(_) => {
                self.region.point_b = Some(now);
                true
            }
        }
    }

    /// Unset both markers and the active segment
    pub fn clear(&mut self) {
        self.region = LoopRegion::default();
        self.active_segment = None;
    }

    /// Make `segment` the region and the active segment
    pub fn apply(&mut self, segment: &Segment, auto_play: bool, is_playing: bool) -> SegmentJump {
        self.region = LoopRegion {
            point_a: Some(segment.start_time),
            point_b: Some(segment.end_time),
        };
        self.active_segment = Some(segment.id);
        SegmentJump {
            segment: segment.clone(),
            seek_to: segment.start_time,
            start_playback: auto_play && !is_playing,
        }
    }

    /// Seek target when `position` has reached or passed B
    pub fn check_boundary(&self, position: f64) -> Option<f64> {
        let (a, b) = self.region.bounds()?;
        (position >= b).then_some(a)
    }

    /// Save the current region as a segment of the active file
    ///
    /// Returns the existing segment when one already has the same bounds.
    /// The boolean is true when a new segment was created.
    pub fn save_current_segment(&mut self) -> Option<(Segment, bool)> {
        let (a, b) = self.region.bounds()?;
        let file = self.active_file.clone()?;

        if let Some(existing) = self.segments.iter().find(|s| s.has_bounds(a, b)) {
            self.active_segment = Some(existing.id);
            return Some((existing.clone(), false));
        }

        let segment = Segment {
            id: SegmentId::generate(),
            label: format!("Segment {}", self.segments.len() + 1),
            start_time: a,
            end_time: b,
            index: self.next_index,
            file,
            created_at: now(),
        };
        self.next_index += 1;
        self.active_segment = Some(segment.id);
        self.segments.push(segment.clone());

        debug!(
            "Saved {} [{:.3}, {:.3}] index {}",
            segment.label, a, b, segment.index
        );
        Some((segment, true))
    }

    /// Remove a segment; its index is not handed out again
    pub fn remove_segment(&mut self, id: SegmentId) -> Option<Segment> {
        let pos = self.segments.iter().position(|s| s.id == id)?;
        if self.active_segment == Some(id) {
            self.active_segment = None;
        }
        Some(self.segments.remove(pos))
    }

    /// Segments ordered for display (latest start first)
    pub fn segments_for_display(&self) -> Vec<Segment> {
        let mut sorted = self.sorted_by_start();
        sorted.reverse();
        sorted.into_iter().cloned().collect()
    }

    /// Segment with the next later start, clamped at the last
    ///
    /// Without an active segment this is the earliest-starting one.
    pub fn select_next_segment(&self) -> Option<Segment> {
        self.select_adjacent(1)
    }

    /// Segment with the next earlier start, clamped at the first
    ///
    /// Without an active segment this is the earliest-starting one.
    pub fn select_previous_segment(&self) -> Option<Segment> {
        self.select_adjacent(-1)
    }

    fn select_adjacent(&self, step: isize) -> Option<Segment> {
        let sorted = self.sorted_by_start();
        if sorted.is_empty() {
            return None;
        }

        let rank = match self
            .active_segment
            .and_then(|id| sorted.iter().position(|s| s.id == id))
        {
            Some(current) => {
                let last = sorted.len() as isize - 1;
                (current as isize + step).clamp(0, last) as usize
            }
            None => 0,
        };
        Some(sorted[rank].clone())
    }

    fn sorted_by_start(&self) -> Vec<&Segment> {
        let mut sorted: Vec<&Segment> = self.segments.iter().collect();
        sorted.sort_by(|x, y| {
            x.start_time
                .partial_cmp(&y.start_time)
                .unwrap_or(Ordering::Equal)
                .then(x.index.cmp(&y.index))
        });
        sorted
    }
}
