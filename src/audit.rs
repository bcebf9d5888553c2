//! Append-only audit log of successful moves.
//!
//! One CSV row per move, header written exactly once when the artifact is
//! first created. Rows are never read back, rewritten, or deleted by this
//! crate; consumers tail or parse the file for reporting.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use thiserror::Error;

/// Timestamp format used in audit rows, local time.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors raised while appending to the audit artifact.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to open audit log: {0}")]
    Open(#[source] std::io::Error),

    #[error("failed to create audit log directory {}: {source}", .path.display())]
    LogDirCreation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to append audit row: {0}")]
    Append(#[from] csv::Error),

    #[error("failed to flush audit log: {0}")]
    Flush(#[source] std::io::Error),
}

/// A single recorded move. Immutable once written.
#[derive(Debug, Clone, Serialize)]
pub struct MoveRecord {
    /// Local wall-clock time of the move.
    pub timestamp: String,
    /// File name at the destination (after any collision disambiguation).
    pub file_name: String,
    /// Directory the file was moved out of.
    pub from: String,
    /// Full destination path.
    pub to: String,
    /// Size in bytes, read from the destination after the move.
    pub size_bytes: u64,
}

impl MoveRecord {
    /// Builds a record for a move that just succeeded.
    pub fn new(source_dir: &Path, destination: &Path, size_bytes: u64) -> Self {
        let file_name = destination
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            file_name,
            from: source_dir.to_string_lossy().to_string(),
            to: destination.to_string_lossy().to_string(),
            size_bytes,
        }
    }
}

/// Handle to the CSV audit artifact.
///
/// Appends are serialized by construction: only one watch loop or sweep runs
/// per process, and it owns the sole `AuditLog`.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Location of the artifact on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row, creating the artifact (and its header) on first use.
    pub fn append(&self, record: &MoveRecord) -> Result<(), AuditError> {
        if let Some(parent) = self.path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| AuditError::LogDirCreation {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(AuditError::Open)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush().map_err(AuditError::Flush)?;
        Ok(())
    }
}
