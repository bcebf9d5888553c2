//! Command-line interface.
//!
//! Two subcommands share one pipeline: `watch` keeps sorting as files arrive,
//! `sweep` sorts whatever is already there and exits. The watched directory
//! defaults to the platform downloads folder.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::warn;
use thiserror::Error;

use crate::audit::AuditLog;
use crate::config::{ConfigError, SorterConfig};
use crate::mover::{MoveError, Mover};
use crate::notifier::{DesktopNotifier, Notifier, NullNotifier};
use crate::output::OutputFormatter;
use crate::watcher::{WatchError, WatchLoop};

/// Sort downloaded files into category subfolders.
#[derive(Debug, Parser)]
#[command(name = "downsort", version, about)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch a directory and sort files as they arrive.
    Watch {
        /// Directory to watch (defaults to the platform downloads folder).
        dir: Option<PathBuf>,
    },
    /// Sort every file currently in a directory, once.
    Sweep {
        /// Directory to sweep (defaults to the platform downloads folder).
        dir: Option<PathBuf>,
    },
}

/// Top-level errors surfaced to the operator.
#[derive(Debug, Error)]
pub enum SortError {
    #[error("no directory given and no platform downloads folder was found")]
    NoWatchDir,

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to read directory {}: {source}", .path.display())]
    ReadDir { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Move(#[from] MoveError),
}

/// Outcome of a batch sweep, reported in the summary and used by tests.
#[derive(Debug, Default)]
pub struct SweepSummary {
    /// Files successfully relocated.
    pub moved: usize,
    /// Files deliberately left alone (filters, temp extensions, vanished).
    pub skipped: usize,
    /// Files whose move failed.
    pub failed: usize,
    /// Moved-file counts keyed by category name.
    pub by_category: HashMap<String, usize>,
}

/// Entry point called from `main` after argument parsing.
pub fn run_cli(cli: Cli) -> Result<(), SortError> {
    let config = SorterConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Watch { dir } => {
            let watched = resolve_dir(dir)?;
            build_watch_loop(&watched, &config)?.run()?;
            Ok(())
        }
        Command::Sweep { dir } => {
            let watched = resolve_dir(dir)?;
            let summary = run_sweep(&watched, &config)?;
            print_sweep_summary(&watched, &config, &summary);
            Ok(())
        }
    }
}

/// Builds the watch-mode driver for a directory.
pub fn build_watch_loop(watched: &Path, config: &SorterConfig) -> Result<WatchLoop, SortError> {
    let filters = config.compile_filters()?;
    Ok(WatchLoop::new(
        watched.to_path_buf(),
        config.stability_policy(),
        filters,
        build_mover(watched, config),
    ))
}

/// Sweeps the direct children of `watched` through the pipeline, once.
///
/// Files are assumed to be at rest, so there is no stability wait; temporary
/// download extensions are still left alone. Per-file errors are logged and
/// counted without aborting the sweep.
pub fn run_sweep(watched: &Path, config: &SorterConfig) -> Result<SweepSummary, SortError> {
    if !watched.is_dir() {
        return Err(SortError::NotADirectory(watched.to_path_buf()));
    }

    let filters = config.compile_filters()?;
    let stability = config.stability_policy();
    let mover = build_mover(watched, config);
    mover.ensure_layout()?;

    // One snapshot of the directory; files landing mid-sweep wait for the
    // next run (or the watcher).
    let entries: Vec<_> = std::fs::read_dir(watched)
        .map_err(|e| SortError::ReadDir {
            path: watched.to_path_buf(),
            source: e,
        })?
        .flatten()
        .collect();

    let mut candidates = Vec::new();
    for entry in entries {
        if let Ok(file_type) = entry.file_type()
            && file_type.is_file()
        {
            let path = entry.path();
            if !mover.is_ignored(&path) && filters.should_include(&path) {
                candidates.push(path);
            }
        }
    }

    let mut summary = SweepSummary::default();
    let pb = OutputFormatter::create_progress_bar(candidates.len() as u64);

    for path in &candidates {
        pb.inc(1);
        if stability.is_temporary(path) {
            summary.skipped += 1;
            continue;
        }
        match mover.move_file(path) {
            Ok(record) => {
                summary.moved += 1;
                let category = mover.category_map().classify(&record.file_name).to_string();
                *summary.by_category.entry(category).or_insert(0) += 1;
            }
            Err(MoveError::SourceVanished(_)) => {
                summary.skipped += 1;
            }
            Err(e) => {
                summary.failed += 1;
                warn!("skip {}: {e}", path.display());
                OutputFormatter::error(&format!("could not move {}: {e}", path.display()));
            }
        }
    }

    pb.finish_and_clear();
    Ok(summary)
}

fn build_mover(watched: &Path, config: &SorterConfig) -> Mover {
    let sorted_root = watched.join(&config.sorter.output_dir);
    let audit = AuditLog::new(
        sorted_root
            .join(&config.sorter.log_dir)
            .join(&config.sorter.log_file),
    );
    let notifier: Box<dyn Notifier> = if config.sorter.notifications {
        Box::new(DesktopNotifier)
    } else {
        Box::new(NullNotifier)
    };
    Mover::new(sorted_root, config.category_map(), audit, notifier)
}

fn resolve_dir(dir: Option<PathBuf>) -> Result<PathBuf, SortError> {
    let dir = dir
        .or_else(dirs::download_dir)
        .ok_or(SortError::NoWatchDir)?;
    if !dir.is_dir() {
        return Err(SortError::NotADirectory(dir));
    }
    Ok(dir)
}

fn print_sweep_summary(watched: &Path, config: &SorterConfig, summary: &SweepSummary) {
    OutputFormatter::summary_table(&summary.by_category, summary.moved);
    if summary.failed > 0 {
        OutputFormatter::warning(&format!(
            "{} file(s) could not be moved, see messages above",
            summary.failed
        ));
    }
    OutputFormatter::plain(&format!("Done. Files moved: {}", summary.moved));
    let sorted_root = watched.join(&config.sorter.output_dir);
    OutputFormatter::plain(&format!(
        "Log saved to: {}",
        sorted_root
            .join(&config.sorter.log_dir)
            .join(&config.sorter.log_file)
            .display()
    ));
    OutputFormatter::plain(&format!("Sorted folders at: {}", sorted_root.display()));
}
