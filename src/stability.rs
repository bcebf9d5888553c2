//! File stability detection.
//!
//! A file that just triggered a create event may still be mid-download. Before
//! moving anything, the pipeline rejects known temporary-file extensions
//! outright and then polls the file's size until two consecutive readings are
//! equal and nonzero. The poll budget is bounded, so a file that never settles
//! is skipped rather than blocking the loop forever; it stays eligible for a
//! later event.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Default poll interval between size readings.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Default number of attempts before giving up (about a 12 second ceiling).
const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Extensions used by in-progress downloads and scratch files.
const DEFAULT_TEMP_EXTENSIONS: &[&str] = &["crdownload", "tmp", "part"];

/// Tuning knobs for the stability check.
///
/// Tests construct this with millisecond intervals; production code uses
/// [`StabilityPolicy::default`] or values from the config file.
#[derive(Debug, Clone)]
pub struct StabilityPolicy {
    poll_interval: Duration,
    max_attempts: u32,
    temp_extensions: HashSet<String>,
}

impl StabilityPolicy {
    pub fn new(poll_interval: Duration, max_attempts: u32, temp_extensions: &[String]) -> Self {
        Self {
            poll_interval,
            max_attempts,
            temp_extensions: temp_extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    /// True when the path carries a temporary-download extension.
    ///
    /// Such files are rejected before any polling: the download tool will
    /// rename them when it finishes, and that rename produces a fresh event
    /// for the final name.
    pub fn is_temporary(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| {
                self.temp_extensions
                    .contains(&ext.to_string_lossy().to_lowercase())
            })
            .unwrap_or(false)
    }

    /// Polls until the file's size is unchanged across two consecutive reads
    /// and greater than zero.
    ///
    /// Returns false once the attempt budget is exhausted. A read that finds
    /// the file missing consumes an attempt and retries; the file may be
    /// mid-rename. A zero-byte file that never grows is never reported
    /// stable.
    pub fn wait_until_stable(&self, path: &Path) -> bool {
        for _ in 0..self.max_attempts {
            let Some(first) = read_size(path) else {
                thread::sleep(self.poll_interval);
                continue;
            };
            thread::sleep(self.poll_interval);
            let Some(second) = read_size(path) else {
                continue;
            };
            if first == second && first > 0 {
                return true;
            }
        }
        false
    }
}

impl Default for StabilityPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            temp_extensions: DEFAULT_TEMP_EXTENSIONS
                .iter()
                .map(|e| (*e).to_string())
                .collect(),
        }
    }
}

fn read_size(path: &Path) -> Option<u64> {
    fs::metadata(path).ok().map(|m| m.len())
}
