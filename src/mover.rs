//! File relocation into category subdirectories.
//!
//! The mover owns the sorted-output tree: it lays out the category folders,
//! decides where a candidate file lands, resolves name collisions, performs
//! the rename, and records provenance in the audit log. It assumes it is the
//! only writer under the sorted root; collision probing is check-then-create
//! without locking.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::audit::{AuditError, AuditLog, MoveRecord};
use crate::category::CategoryMap;
use crate::notifier::Notifier;

/// Title used for the notification side-channel.
const NOTIFICATION_TITLE: &str = "Downloads sorted";

/// Errors raised while relocating a single file.
///
/// None of these abort the watch loop or the sweep; the caller logs them and
/// moves on to the next candidate. The source file is left untouched on
/// failure, except as noted on [`MoveError::Audit`].
#[derive(Debug, Error)]
pub enum MoveError {
    #[error("path has no file name component: {}", .0.display())]
    InvalidName(PathBuf),

    #[error("failed to create category directory {}: {source}", .path.display())]
    DirectoryCreation {
        path: PathBuf,
        source: io::Error,
    },

    #[error("cannot move {} across filesystems to {}", .from.display(), .to.display())]
    CrossDevice { from: PathBuf, to: PathBuf },

    #[error("source vanished before it could be moved: {}", .0.display())]
    SourceVanished(PathBuf),

    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("failed to stat moved file {}: {source}", .path.display())]
    DestinationStat {
        path: PathBuf,
        source: io::Error,
    },

    /// The rename itself succeeded; only the provenance row failed.
    #[error(transparent)]
    Audit(#[from] AuditError),
}

/// Moves files into the sorted-output tree and records every move.
pub struct Mover {
    sorted_root: PathBuf,
    map: CategoryMap,
    audit: AuditLog,
    notifier: Box<dyn Notifier>,
}

impl Mover {
    pub fn new(
        sorted_root: PathBuf,
        map: CategoryMap,
        audit: AuditLog,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            sorted_root,
            map,
            audit,
            notifier,
        }
    }

    pub fn sorted_root(&self) -> &Path {
        &self.sorted_root
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn category_map(&self) -> &CategoryMap {
        &self.map
    }

    /// Creates the sorted root, the log directory, and one folder per
    /// category. Called once at startup so the tree exists before the first
    /// event arrives.
    pub fn ensure_layout(&self) -> Result<(), MoveError> {
        let mut dirs: Vec<PathBuf> = vec![self.sorted_root.clone()];
        if let Some(log_dir) = self.audit.path().parent() {
            dirs.push(log_dir.to_path_buf());
        }
        dirs.extend(self.map.categories().map(|c| self.sorted_root.join(c)));

        for dir in dirs {
            fs::create_dir_all(&dir).map_err(|e| MoveError::DirectoryCreation {
                path: dir.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// True for paths the sorter must never process: anything inside the
    /// sorted-output tree (the log folder included) and the audit artifact
    /// itself. Keeps the watcher from reacting to its own writes.
    pub fn is_ignored(&self, path: &Path) -> bool {
        path.starts_with(&self.sorted_root) || path == self.audit.path()
    }

    /// Relocates one stable, non-ignored candidate file.
    ///
    /// Classifies by name, ensures the category folder, picks a
    /// collision-free destination, renames, then appends a [`MoveRecord`]
    /// and fires a best-effort notification. Returns the record on success.
    pub fn move_file(&self, path: &Path) -> Result<MoveRecord, MoveError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| MoveError::InvalidName(path.to_path_buf()))?;

        let category = self.map.classify(&file_name);
        let category_dir = self.sorted_root.join(category);
        fs::create_dir_all(&category_dir).map_err(|e| MoveError::DirectoryCreation {
            path: category_dir.clone(),
            source: e,
        })?;

        let destination = resolve_destination(&category_dir, &file_name);

        fs::rename(path, &destination).map_err(|e| match e.kind() {
            io::ErrorKind::CrossesDevices => MoveError::CrossDevice {
                from: path.to_path_buf(),
                to: destination.clone(),
            },
            io::ErrorKind::NotFound => MoveError::SourceVanished(path.to_path_buf()),
            _ => MoveError::Rename {
                from: path.to_path_buf(),
                to: destination.clone(),
                source: e,
            },
        })?;

        let size_bytes = fs::metadata(&destination)
            .map_err(|e| MoveError::DestinationStat {
                path: destination.clone(),
                source: e,
            })?
            .len();

        let source_dir = path.parent().unwrap_or(Path::new(""));
        let record = MoveRecord::new(source_dir, &destination, size_bytes);
        self.audit.append(&record)?;
        debug!("moved {} to {}", path.display(), destination.display());

        self.notifier.notify(
            NOTIFICATION_TITLE,
            &format!("{} → {}", record.file_name, category),
        );

        Ok(record)
    }
}

/// Picks a destination name that does not collide with an existing file.
///
/// The first probe is the original name; afterwards ` (n)` is inserted
/// before the extension with n counting up from 1. Numbers are never reused
/// across runs because the probe always consults the live filesystem.
fn resolve_destination(category_dir: &Path, file_name: &str) -> PathBuf {
    let mut destination = category_dir.join(file_name);
    if !destination.exists() {
        return destination;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_string());
    let extension = name.extension().map(|e| e.to_string_lossy().to_string());

    let mut n = 1u64;
    loop {
        let candidate = match &extension {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        destination = category_dir.join(candidate);
        if !destination.exists() {
            return destination;
        }
        n += 1;
    }
}
