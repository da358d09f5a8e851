//! Read progress reporting.

use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Progress information during a read.
#[derive(Debug, Clone)]
pub struct ReadProgress {
    /// Directories (or containers) fully listed.
    pub dirs_done: u64,
    /// Directories discovered so far, including the root.
    pub dirs_todo: u64,
    /// Entries produced so far.
    pub entries_found: u64,
    /// Directory being listed.
    pub current_dir: PathBuf,
    /// Number of warnings recorded.
    pub warnings_count: u64,
    /// Time elapsed since the read started.
    pub elapsed: Duration,
}

impl ReadProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            dirs_done: 0,
            dirs_todo: 1,
            entries_found: 0,
            current_dir: PathBuf::new(),
            warnings_count: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Fraction of discovered directories already listed, in `[0, 1]`.
    pub fn fraction(&self) -> f32 {
        if self.dirs_todo == 0 {
            return 1.0;
        }
        (self.dirs_done as f32 / self.dirs_todo as f32).min(1.0)
    }
}

impl Default for ReadProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal progress tracker with timing.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    dirs_done: u64,
    dirs_todo: u64,
    entries_found: u64,
    warnings_count: u64,
    current_dir: PathBuf,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            dirs_done: 0,
            dirs_todo: 1,
            entries_found: 0,
            warnings_count: 0,
            current_dir: PathBuf::new(),
        }
    }

    pub fn record_discovered(&mut self) {
        self.dirs_todo += 1;
    }

    pub fn record_listed(&mut self, entries: usize) {
        self.dirs_done += 1;
        self.entries_found += entries as u64;
    }

    pub fn record_warning(&mut self) {
        self.warnings_count += 1;
    }

    pub fn set_current_dir(&mut self, dir: PathBuf) {
        self.current_dir = dir;
    }

    pub fn snapshot(&self) -> ReadProgress {
        ReadProgress {
            dirs_done: self.dirs_done,
            dirs_todo: self.dirs_todo,
            entries_found: self.entries_found,
            current_dir: self.current_dir.clone(),
            warnings_count: self.warnings_count,
            elapsed: self.start_time.elapsed(),
        }
    }
}
