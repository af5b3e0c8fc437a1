//! Append-only decision log.
//!
//! Each resolved issue becomes one JSON object on its own line. Records are
//! written with a single `write_all` while holding an exclusive lock, so a
//! crash can leave at most one torn line at the tail. The next append starts
//! on a fresh line and readers skip the fragment.

use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, warn};

use crate::decision::{Decision, SelectionMethod};
use crate::error::{Result, StatecraftError};

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "choices.ndjson";

/// Append-only NDJSON store of decisions.
#[derive(Debug, Clone)]
pub struct DecisionLog {
    path: PathBuf,
}

/// Everything readable from the log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogScan {
    /// Complete, valid records in file order.
    pub records: Vec<Decision>,
    /// Non-empty lines that could not be decoded.
    pub skipped: usize,
}

/// Record counts for a quick integrity check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogStats {
    /// Valid records.
    pub total: usize,
    /// Records chosen by the model.
    pub ai: usize,
    /// Records chosen by the random fallback.
    pub random: usize,
    /// Lines skipped as torn or invalid.
    pub skipped: usize,
}

impl LogScan {
    /// Summarise the scan.
    #[must_use]
    pub fn stats(&self) -> LogStats {
        let ai = self
            .records
            .iter()
            .filter(|record| record.method == SelectionMethod::Ai)
            .count();
        LogStats {
            total: self.records.len(),
            ai,
            random: self.records.len() - ai,
            skipped: self.skipped,
        }
    }
}

impl DecisionLog {
    /// Create a log handle. Nothing is touched until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one decision as a single line.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, locked or written.
    pub fn append(&self, decision: &Decision) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut line = serde_json::to_vec(decision)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;

        FileExt::lock_exclusive(&file).map_err(|e| {
            StatecraftError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to lock {}: {e}", self.path.display()),
            ))
        })?;

        if ends_with_torn_line(&mut file)? {
            warn!(
                "Decision log {} ends with a partial line; starting a new one",
                self.path.display()
            );
            line.insert(0, b'\n');
        }

        file.write_all(&line)?;
        file.sync_data()?;
        FileExt::unlock(&file)?;

        debug!(
            issue_id = %decision.issue_id,
            option_id = %decision.option_id,
            "Appended decision to {}",
            self.path.display()
        );
        Ok(())
    }

    /// Read every complete record, skipping torn or invalid lines.
    ///
    /// A missing file reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn read_all(&self) -> Result<LogScan> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LogScan::default()),
            Err(e) => return Err(e.into()),
        };

        let mut scan = LogScan::default();
        let lines = bytes.split(|byte| *byte == b'\n');
        for (index, line) in lines.enumerate() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<Decision>(line) {
                Ok(record) => scan.records.push(record),
                Err(e) => {
                    warn!(
                        "Skipping unreadable line {} in {}: {}",
                        index + 1,
                        self.path.display(),
                        e
                    );
                    scan.skipped += 1;
                }
            }
        }
        Ok(scan)
    }
}

fn ends_with_torn_line(file: &mut fs::File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0_u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
