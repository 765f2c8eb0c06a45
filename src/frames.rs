use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// A working directory of merged frames plus its parent holding the originals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameDir {
    merged_dir: PathBuf,
    original_dir: PathBuf,
    max_index: u32,
}

impl FrameDir {
    /// Scan `dir` for `NNNNN.png` frames. Names that aren't plain numbers are
    /// skipped; the largest number becomes the progress bound.
    pub fn scan(dir: &Path) -> Result<Self> {
        let io_err = |source| Error::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut max_index = None;
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("png") {
                continue;
            }
            let Some(n) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u32>().ok())
            else {
                log::debug!("Skipping non-frame file {}", path.display());
                continue;
            };
            max_index = max_index.max(Some(n));
        }

        let max_index = max_index.ok_or_else(|| Error::EmptyDirectory(dir.to_path_buf()))?;
        let original_dir = dir
            .parent()
            .ok_or_else(|| Error::NotFound(dir.to_path_buf()))?
            .to_path_buf();
        log::info!("Found frames up to {} in {}", max_index, dir.display());
        Ok(Self {
            merged_dir: dir.to_path_buf(),
            original_dir,
            max_index,
        })
    }

    pub fn file_name(index: u32) -> String {
        format!("{index:05}.png")
    }

    pub fn merged_path(&self, index: u32) -> PathBuf {
        self.merged_dir.join(Self::file_name(index))
    }

    pub fn original_path(&self, index: u32) -> PathBuf {
        self.original_dir.join(Self::file_name(index))
    }

    pub fn merged_dir(&self) -> &Path {
        &self.merged_dir
    }

    pub fn max_index(&self) -> u32 {
        self.max_index
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Scan {
    direction: Direction,
    due: Instant,
}

/// Current frame number and the continuous-advance schedule.
///
/// `next` has no upper bound and `previous` stops at 1. The index moves
/// before the frame is loaded and stays moved if loading fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Navigator {
    index: u32,
    scan: Option<Scan>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            index: 1,
            scan: None,
        }
    }
}

/// Parse a frame number typed by the operator.
pub fn parse_index(text: &str) -> Result<u32> {
    let text = text.trim();
    text.parse::<u32>()
        .map_err(|_| Error::NotANumber(text.to_string()))
}

impl Navigator {
    pub const MIN_DELAY_MS: u64 = 1;
    pub const MAX_DELAY_MS: u64 = 1000;

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn go_to(&mut self, index: u32) -> Result<()> {
        if index == 0 {
            return Err(Error::InvalidIndex(index));
        }
        self.index = index;
        Ok(())
    }

    pub fn next(&mut self) {
        self.index += 1;
    }

    /// Returns false (and does nothing) at frame 1.
    pub fn previous(&mut self) -> bool {
        if self.index > 1 {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    /// Take one step. Returns whether the index moved.
    pub fn step(&mut self, direction: Direction) -> bool {
        match direction {
            Direction::Forward => {
                self.next();
                true
            }
            Direction::Backward => self.previous(),
        }
    }

    pub fn clamp_delay(delay_ms: u64) -> Duration {
        Duration::from_millis(delay_ms.clamp(Self::MIN_DELAY_MS, Self::MAX_DELAY_MS))
    }

    /// Begin continuous advance. The caller takes the first step right away;
    /// the next one falls due after `delay_ms`.
    pub fn start_scan(&mut self, direction: Direction, now: Instant, delay_ms: u64) {
        self.scan = Some(Scan {
            direction,
            due: now + Self::clamp_delay(delay_ms),
        });
    }

    pub fn stop_scan(&mut self) {
        self.scan = None;
    }

    pub fn is_scanning(&self) -> bool {
        self.scan.is_some()
    }

    /// Called on every tick. Returns the direction to step in if a step is
    /// due, and schedules the one after it.
    pub fn poll_scan(&mut self, now: Instant, delay_ms: u64) -> Option<Direction> {
        let scan = self.scan.as_mut()?;
        if now < scan.due {
            return None;
        }
        scan.due = now + Self::clamp_delay(delay_ms);
        Some(scan.direction)
    }

    /// Time left until the next scheduled step.
    pub fn time_to_next_step(&self, now: Instant) -> Option<Duration> {
        self.scan.map(|s| s.due.saturating_duration_since(now))
    }

    /// `"{index}/{max}"` label and a 0..=1 progress fraction.
    pub fn progress(&self, max_index: u32) -> (String, f32) {
        let fraction = if max_index == 0 {
            0.0
        } else {
            (self.index as f32 / max_index as f32).min(1.0)
        };
        (format!("{}/{}", self.index, max_index), fraction)
    }
}
