//! Ordered file listing with loop-mode navigation
//!
//! `next_file` / `previous_file` only answer the question; they never move
//! `current`. The coordinator commits the move once the load succeeds.

use loopwise_common::{FileId, LoopMode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Shuffle draws before falling back to an explicit candidate list
const SHUFFLE_RETRIES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Playback queue
#[derive(Debug)]
pub struct PlaybackQueue {
    files: Vec<FileId>,
    current: Option<FileId>,
    mode: LoopMode,
    rng: StdRng,
}

impl PlaybackQueue {
    /// Create an empty queue with an entropy-seeded shuffle
    pub fn new(mode: LoopMode) -> Self {
        Self::with_rng(mode, StdRng::from_entropy())
    }

    /// Create an empty queue with a deterministic shuffle
    pub fn with_seed(mode: LoopMode, seed: u64) -> Self {
        Self::with_rng(mode, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mode: LoopMode, rng: StdRng) -> Self {
        Self {
            files: Vec::new(),
            current: None,
            mode,
            rng,
        }
    }

    /// Replace the listing; `current` is dropped if it disappeared
    pub fn update_queue(&mut self, files: Vec<FileId>) {
        self.files = files;
        if let Some(current) = &self.current {
            if !self.files.contains(current) {
                debug!("Current file {} left the listing", current);
                self.current = None;
            }
        }
    }

    /// Mark a listed file as current; unlisted files are refused
    pub fn set_current(&mut self, file: Option<FileId>) -> bool {
        match file {
            Some(file) if !self.files.contains(&file) => false,
            file => {
                self.current = file;
                true
            }
        }
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.mode = mode;
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.mode
    }

    pub fn files(&self) -> &[FileId] {
        &self.files
    }

    pub fn current(&self) -> Option<&FileId> {
        self.current.as_ref()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn next_file(&mut self) -> Option<FileId> {
        self.adjacent(Direction::Forward)
    }

    pub fn previous_file(&mut self) -> Option<FileId> {
        self.adjacent(Direction::Backward)
    }

    fn adjacent(&mut self, direction: Direction) -> Option<FileId> {
        if self.files.is_empty() {
            return None;
        }

        match self.mode {
            LoopMode::Off | LoopMode::RepeatOne => None,
            LoopMode::RepeatAll => match self.current_index() {
                Some(i) => Some(self.step(i, direction)),
                None => self.files.first().cloned(),
            },
            LoopMode::AutoPlayNext => {
                let i = self.current_index()?;
                Some(self.step(i, direction))
            }
            LoopMode::Shuffle => self.shuffle_pick(),
        }
    }

    fn current_index(&self) -> Option<usize> {
        let current = self.current.as_ref()?;
        self.files.iter().position(|f| f == current)
    }

    fn step(&self, index: usize, direction: Direction) -> FileId {
        let len = self.files.len();
        let next = match direction {
            Direction::Forward => (index + 1) % len,
            Direction::Backward => (index + len - 1) % len,
        };
        self.files[next].clone()
    }

    fn shuffle_pick(&mut self) -> Option<FileId> {
        let len = self.files.len();
        if len == 1 {
            return self.files.first().cloned();
        }

        let Some(current) = self.current_index() else {
            let pick = self.rng.gen_range(0..len);
            return Some(self.files[pick].clone());
        };

        for _ in 0..SHUFFLE_RETRIES {
            let pick = self.rng.gen_range(0..len);
            if pick != current {
                return Some(self.files[pick].clone());
            }
        }

        let candidates: Vec<usize> = (0..len).filter(|i| *i != current).collect();
        let pick = candidates[self.rng.gen_range(0..candidates.len())];
        Some(self.files[pick].clone())
    }
}
