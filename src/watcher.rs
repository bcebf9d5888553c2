//! Event-driven watch mode.
//!
//! Subscribes to filesystem notifications on the watched directory
//! (non-recursive) and funnels every candidate path through the sorting
//! pipeline. Dispatch is single-threaded by construction: the `notify`
//! backend thread only enqueues events on a channel, and this loop drains
//! them one at a time, finishing each move (including the blocking stability
//! poll) before looking at the next event. That serializes all moves and
//! audit appends without any locking.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use log::{debug, error, info, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;

use crate::config::CompiledFilters;
use crate::mover::{MoveError, Mover};
use crate::output::OutputFormatter;
use crate::stability::StabilityPolicy;

/// How often the loop wakes up to check the shutdown flag while idle.
const SHUTDOWN_POLL: Duration = Duration::from_millis(250);

/// Errors that prevent the watch loop from starting.
///
/// Per-candidate failures never surface here; they are logged and the loop
/// keeps going.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to watch directory: {0}")]
    Watch(#[from] notify::Error),

    #[error("failed to install shutdown handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error(transparent)]
    Layout(#[from] MoveError),
}

/// The watch-mode driver: one watched directory, one pipeline.
pub struct WatchLoop {
    watched: PathBuf,
    stability: StabilityPolicy,
    filters: CompiledFilters,
    mover: Mover,
}

impl WatchLoop {
    pub fn new(
        watched: PathBuf,
        stability: StabilityPolicy,
        filters: CompiledFilters,
        mover: Mover,
    ) -> Self {
        Self {
            watched,
            stability,
            filters,
            mover,
        }
    }

    /// Runs until an interrupt signal arrives.
    ///
    /// Any move in flight when the signal lands finishes before the loop
    /// exits; the shutdown flag is only consulted between events.
    pub fn run(&self) -> Result<(), WatchError> {
        self.mover.ensure_layout()?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))?;

        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(tx, notify::Config::default())?;
        watcher.watch(&self.watched, RecursiveMode::NonRecursive)?;

        OutputFormatter::info(&format!("Watching: {}", self.watched.display()));
        OutputFormatter::info(&format!(
            "Log file: {}",
            self.mover.audit().path().display()
        ));

        while !shutdown.load(Ordering::Relaxed) {
            match rx.recv_timeout(SHUTDOWN_POLL) {
                Ok(Ok(event)) => self.handle_event(event),
                Ok(Err(e)) => warn!("watch backend error: {e}"),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    error!("watch channel disconnected, stopping");
                    break;
                }
            }
        }

        info!("watcher stopped");
        Ok(())
    }

    fn handle_event(&self, event: Event) {
        if !is_candidate_kind(&event.kind) {
            return;
        }
        for path in &event.paths {
            self.process_candidate(path);
        }
    }

    /// Runs one path through the pipeline: existence short-circuit, ignore
    /// policy, filter rules, temp-extension rejection, stability wait, move.
    ///
    /// Duplicate notifications for the same path are harmless: by the time
    /// the second one is processed the file is gone and the existence check
    /// turns it into a no-op.
    pub fn process_candidate(&self, path: &Path) {
        if !path.is_file() {
            return;
        }
        if self.mover.is_ignored(path) {
            return;
        }
        if !self.filters.should_include(path) {
            debug!("filtered out: {}", path.display());
            return;
        }
        if self.stability.is_temporary(path) {
            debug!("temporary file, waiting for rename: {}", path.display());
            return;
        }
        if !self.stability.wait_until_stable(path) {
            warn!("skip, not stable: {}", display_name(path));
            return;
        }

        match self.mover.move_file(path) {
            Ok(record) => {
                OutputFormatter::success(&format!("{} -> {}", display_name(path), record.to));
            }
            Err(MoveError::SourceVanished(_)) => {
                // A duplicate event raced us and the file is already gone.
                debug!("source vanished, nothing to do: {}", path.display());
            }
            Err(e) => {
                OutputFormatter::error(&format!("could not move {}: {e}", display_name(path)));
            }
        }
    }
}

/// Only create, modify, and rename events feed the pipeline. Rename-from
/// paths slip through here but die at the existence check; access and
/// remove events never matter.
fn is_candidate_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::category::CategoryMap;
    use crate::config::SorterConfig;
    use crate::notifier::NullNotifier;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};
    use std::fs;
    use tempfile::TempDir;

    fn watch_loop_for(root: &Path) -> WatchLoop {
        let sorted_root = root.join("Sorted");
        let audit = AuditLog::new(sorted_root.join("_logs").join("sorted_moves.csv"));
        let mover = Mover::new(
            sorted_root,
            CategoryMap::new(),
            audit,
            Box::new(NullNotifier),
        );
        let config = SorterConfig::default();
        WatchLoop::new(
            root.to_path_buf(),
            StabilityPolicy::new(Duration::from_millis(5), 10, &["crdownload".to_string()]),
            config.compile_filters().expect("filters"),
            mover,
        )
    }

    #[test]
    fn test_event_kind_selection() {
        assert!(is_candidate_kind(&EventKind::Create(CreateKind::File)));
        assert!(is_candidate_kind(&EventKind::Modify(ModifyKind::Any)));
        assert!(!is_candidate_kind(&EventKind::Access(AccessKind::Any)));
        assert!(!is_candidate_kind(&EventKind::Remove(RemoveKind::File)));
        assert!(!is_candidate_kind(&EventKind::Any));
        assert!(!is_candidate_kind(&EventKind::Other));
    }

    #[test]
    fn test_candidate_is_moved_into_category() {
        let dir = TempDir::new().expect("temp dir");
        let watch = watch_loop_for(dir.path());
        watch.mover.ensure_layout().expect("layout");

        let file = dir.path().join("movie.mkv");
        fs::write(&file, b"frames").expect("write");

        watch.process_candidate(&file);
        assert!(!file.exists());
        assert!(dir.path().join("Sorted/Videos/movie.mkv").exists());
    }

    #[test]
    fn test_missing_path_is_a_noop() {
        let dir = TempDir::new().expect("temp dir");
        let watch = watch_loop_for(dir.path());
        watch.mover.ensure_layout().expect("layout");

        // Simulates the duplicate-notification case: the file moved already.
        watch.process_candidate(&dir.path().join("already-gone.pdf"));
        assert!(!dir.path().join("Sorted/PDFs/already-gone.pdf").exists());
    }

    #[test]
    fn test_sorted_tree_is_never_reprocessed() {
        let dir = TempDir::new().expect("temp dir");
        let watch = watch_loop_for(dir.path());
        watch.mover.ensure_layout().expect("layout");

        let sorted = dir.path().join("Sorted/PDFs/report.pdf");
        fs::write(&sorted, b"pdf").expect("write");

        watch.process_candidate(&sorted);
        // Still where it was, not re-sorted into Sorted/Sorted/...
        assert!(sorted.exists());
    }

    #[test]
    fn test_temporary_extension_is_never_moved() {
        let dir = TempDir::new().expect("temp dir");
        let watch = watch_loop_for(dir.path());
        watch.mover.ensure_layout().expect("layout");

        let file = dir.path().join("song.crdownload");
        fs::write(&file, b"partial data").expect("write");

        watch.process_candidate(&file);
        assert!(file.exists());
    }

    #[test]
    fn test_unstable_file_is_skipped_without_destruction() {
        let dir = TempDir::new().expect("temp dir");
        let watch = watch_loop_for(dir.path());
        watch.mover.ensure_layout().expect("layout");

        let file = dir.path().join("empty.pdf");
        fs::write(&file, b"").expect("write");

        watch.process_candidate(&file);
        // Zero-byte files never stabilize; the candidate stays put.
        assert!(file.exists());
        assert!(!dir.path().join("Sorted/PDFs/empty.pdf").exists());
    }

    #[test]
    fn test_directories_are_ignored() {
        let dir = TempDir::new().expect("temp dir");
        let watch = watch_loop_for(dir.path());
        watch.mover.ensure_layout().expect("layout");

        let subdir = dir.path().join("holiday-photos");
        fs::create_dir(&subdir).expect("mkdir");

        watch.process_candidate(&subdir);
        assert!(subdir.exists());
    }
}
