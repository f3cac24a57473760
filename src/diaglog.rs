//! Size-bounded diagnostic log for connection and transport events.
//!
//! The log is a plain text file, one `<timestamp> | <message>` line per
//! event. The file is opened and closed on every write; no handle or
//! in-memory copy is kept between calls. When an append pushes the file
//! past [`MAX_LOG_SIZE`] it is rewritten with only its most recent
//! [`TRIM_TO_SIZE`] bytes, minus any partial leading line left by the cut.
//!
//! Write failures are swallowed: diagnostics must never take the bridge
//! down.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::debug;

/// Upper size bound that triggers a trim.
pub const MAX_LOG_SIZE: u64 = 40_000;
/// Size the file is reduced to when trimmed.
pub const TRIM_TO_SIZE: u64 = 20_000;

#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    path: Option<PathBuf>,
}

impl DiagnosticLog {
    /// Creates a log writing to `path`. `None` disables logging entirely.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// A log that drops every message.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Appends one timestamped line, trimming the file afterwards if it
    /// grew past the bound. A no-op when no path is configured.
    pub fn log(&self, message: &str) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(err) = append_line(path, message) {
            debug!("diagnostic log write to {} failed: {err}", path.display());
        }
    }
}

fn append_line(path: &Path, message: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    writeln!(file, "{stamp} | {message}")?;
    let size = file.metadata()?.len();
    drop(file);

    if size > MAX_LOG_SIZE {
        trim(path)?;
    }
    Ok(())
}

/// Rewrites the file with its most recent `TRIM_TO_SIZE` bytes, dropping
/// the first line after the cut so no truncated record survives.
fn trim(path: &Path) -> io::Result<()> {
    let content = fs::read(path)?;
    let cut = content.len().saturating_sub(TRIM_TO_SIZE as usize);
    let mut tail = &content[cut..];
    if cut > 0 {
        if let Some(newline) = tail.iter().position(|&b| b == b'\n') {
            tail = &tail[newline + 1..];
        }
    }
    fs::write(path, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_carry_timestamp_and_separator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diag.log");
        let log = DiagnosticLog::new(Some(path.clone()));

        log.log("connack: success");
        log.log("transport error: connection refused");

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let (stamp, message) = line.split_once(" | ").unwrap();
            // "YYYY-MM-DD HH:MM:SS"
            assert_eq!(stamp.len(), 19);
            assert!(!message.is_empty());
        }
    }

    #[test]
    fn disabled_log_writes_nothing() {
        let log = DiagnosticLog::disabled();
        log.log("dropped");
        // No path, nothing to assert beyond not panicking.

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.log");
        DiagnosticLog::new(None).log("also dropped");
        assert!(!path.exists());
    }

    #[test]
    fn oversized_file_is_trimmed_without_partial_leading_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diag.log");
        let log = DiagnosticLog::new(Some(path.clone()));

        // Every line is 100 bytes: 19 stamp + 3 separator + 77 message + newline.
        let message = "m".repeat(77);
        for _ in 0..401 {
            log.log(&message);
        }

        let size = fs::metadata(&path).unwrap().len();
        assert!(size <= TRIM_TO_SIZE, "file still {size} bytes after trim");
        assert!(size > 0);

        let content = fs::read_to_string(&path).unwrap();
        let first = content.lines().next().unwrap();
        let (stamp, body) = first.split_once(" | ").unwrap();
        assert_eq!(stamp.len(), 19);
        assert_eq!(body, message);
    }

    #[test]
    fn appends_keep_working_after_a_trim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diag.log");
        let log = DiagnosticLog::new(Some(path.clone()));

        let message = "x".repeat(77);
        for _ in 0..500 {
            log.log(&message);
        }
        log.log("after rotation");

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.lines().last().unwrap().ends_with("after rotation"));
        assert!(fs::metadata(&path).unwrap().len() <= MAX_LOG_SIZE);
    }
}
