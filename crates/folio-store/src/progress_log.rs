//! Append-only progress log
//!
//! One human-readable line per event, prefixed with a local timestamp:
//!
//! ```text
//! [2024-05-01 14:03:22] SUCCESS: Doc 17 (report.pdf) - 5120 chars via improved_pdfpig
//! ```

use chrono::Local;
use std::fmt::Display;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Timestamp format of every log line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Append-only log file of one session
#[derive(Debug, Clone)]
pub struct ProgressLog {
    path: PathBuf,
}

impl ProgressLog {
    /// Log writing to `path`; the file and its parent are created on first append
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line
    pub fn append(&self, message: impl Display) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let line = format!("[{}] {}\n", Local::now().format(TIMESTAMP_FORMAT), message);
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()
    }

    /// Last `n` lines, oldest first; empty if the log does not exist yet
    pub fn tail(&self, n: usize) -> io::Result<Vec<String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let lines: Vec<&str> = contents.lines().collect();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].iter().map(|l| l.to_string()).collect())
    }
}
