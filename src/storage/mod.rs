//! Reading log on removable storage.
//!
//! One text line per measurement, append-only, no timestamps — the position
//! in the file is the ordering.  The file is opened and closed on every
//! operation: the card can be ejected and remounted between ticks, and a
//! persistent handle would pin a stale FATFS state.
//!
//! On device the path lives under the SD mount (`/sdcard/...`, std::fs over
//! the ESP-IDF VFS); on the host it points into a scratch directory.

pub mod tail;

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use tail::tail_lines;

/// The append-only measurement log.
///
/// Single writer (the tick loop).  The tick loop is also the only reader,
/// through [`window`](Self::window).
pub struct ReadingLog {
    path: PathBuf,
}

impl ReadingLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one reading as a `{:.2}`-formatted line, creating the file on
    /// first use.  A failure loses this measurement only; nothing is
    /// buffered or retried.
    pub fn append(&self, value: f32) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| {
                log::debug!("reading log open for append failed: {e}");
                StorageError::Unavailable
            })?;
        writeln!(file, "{value:.2}").map_err(|e| {
            log::debug!("reading log append failed: {e}");
            StorageError::WriteFailed
        })
    }

    /// Compute the current historical window: the last `max_items` lines,
    /// oldest-first.  `max_items == 0` short-circuits without touching the
    /// filesystem.
    pub fn window(&self, max_items: usize) -> Result<String, StorageError> {
        if max_items == 0 {
            return Ok(String::new());
        }
        let mut file = File::open(&self.path).map_err(|e| {
            log::debug!("reading log open for scan failed: {e}");
            StorageError::Unavailable
        })?;
        tail_lines(&mut file, max_items).map_err(|e| {
            log::debug!("reading log tail scan failed: {e}");
            StorageError::ReadFailed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_log(name: &str) -> ReadingLog {
        let mut path = std::env::temp_dir();
        path.push(format!("templog-{}-{}.txt", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        ReadingLog::new(path)
    }

    #[test]
    fn append_then_window_round_trip() {
        let log = scratch_log("round-trip");
        log.append(20.1).unwrap();
        log.append(20.5).unwrap();
        log.append(21.0).unwrap();
        assert_eq!(log.window(50).unwrap(), "20.10\n20.50\n21.00\n");
        assert_eq!(log.window(2).unwrap(), "20.50\n21.00\n");
        let _ = std::fs::remove_file(log.path());
    }

    #[test]
    fn negative_and_sentinel_values_format_as_lines() {
        let log = scratch_log("formatting");
        log.append(-3.5).unwrap();
        log.append(f32::NAN).unwrap();
        assert_eq!(log.window(10).unwrap(), "-3.50\nNaN\n");
        let _ = std::fs::remove_file(log.path());
    }

    #[test]
    fn window_on_missing_file_is_unavailable() {
        let log = scratch_log("missing");
        assert_eq!(log.window(50), Err(StorageError::Unavailable));
    }

    #[test]
    fn zero_max_items_succeeds_even_without_file() {
        let log = scratch_log("zero-items");
        assert_eq!(log.window(0), Ok(String::new()));
    }

    #[test]
    fn append_creates_the_file() {
        let log = scratch_log("creates");
        assert!(!log.path().exists());
        log.append(19.8).unwrap();
        assert!(log.path().exists());
        let _ = std::fs::remove_file(log.path());
    }
}
