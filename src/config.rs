//! Sorter configuration.
//!
//! Everything is optional: with no config file present the defaults reproduce
//! the stock behavior (a `Sorted` tree inside the watched directory, the
//! built-in category table, 200 ms stability polling). A TOML file can tune
//! the output layout, the stability check, the category table, and the
//! file-filtering rules applied before candidates enter the pipeline.
//!
//! # Configuration File Format
//!
//! ```toml
//! [sorter]
//! output_dir = "Sorted"
//! log_dir = "_logs"
//! log_file = "sorted_moves.csv"
//! notifications = true
//!
//! [stability]
//! poll_interval_ms = 200
//! max_attempts = 60
//! temp_extensions = ["crdownload", "tmp", "part"]
//!
//! [categories]
//! Ebooks = ["epub", "mobi"]
//!
//! [filters]
//! enable_hidden_files = false
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.swp"]
//! extensions = ["bak"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```

use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::category::CategoryMap;
use crate::stability::StabilityPolicy;

/// Errors raised while loading or compiling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),

    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SorterConfig {
    /// Output tree layout and notification toggle.
    #[serde(default)]
    pub sorter: SorterSection,

    /// Stability-check tuning.
    #[serde(default)]
    pub stability: StabilitySection,

    /// Extra category mappings: category name to extension list. Entries
    /// extend the built-in table; reassigning an existing extension moves it
    /// to the new category.
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,

    /// Rules deciding which files ever enter the pipeline.
    #[serde(default)]
    pub filters: FilterRules,
}

/// Layout of the sorted-output tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SorterSection {
    /// Name of the sorted-output root, created under the watched directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Name of the log subfolder under the output root.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// File name of the CSV audit artifact inside the log subfolder.
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Whether to pop a desktop notification per move.
    #[serde(default = "default_notifications")]
    pub notifications: bool,
}

fn default_output_dir() -> String {
    "Sorted".to_string()
}

fn default_log_dir() -> String {
    "_logs".to_string()
}

fn default_log_file() -> String {
    "sorted_moves.csv".to_string()
}

fn default_notifications() -> bool {
    true
}

impl Default for SorterSection {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            log_dir: default_log_dir(),
            log_file: default_log_file(),
            notifications: default_notifications(),
        }
    }
}

/// Stability-check tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilitySection {
    /// Milliseconds between size readings.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Attempts before a candidate is declared not stable.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Extensions (without dots) treated as in-progress downloads.
    #[serde(default = "default_temp_extensions")]
    pub temp_extensions: Vec<String>,
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_max_attempts() -> u32 {
    60
}

fn default_temp_extensions() -> Vec<String> {
    ["crdownload", "tmp", "part"]
        .iter()
        .map(|e| (*e).to_string())
        .collect()
}

impl Default for StabilitySection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            temp_extensions: default_temp_extensions(),
        }
    }
}

/// File filtering rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to process hidden files (starting with "."). Defaults to false.
    #[serde(default)]
    pub enable_hidden_files: bool,

    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: false,
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

/// Rules for excluding files from sorting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns to exclude (e.g., "*.swp").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude (e.g., "bak").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns to exclude, matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including files, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    /// Glob patterns that override exclude rules.
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl SorterConfig {
    /// Load configuration with fallback to defaults.
    ///
    /// Search order:
    /// 1. An explicitly provided path (errors if missing or invalid)
    /// 2. `.downsort.toml` in the current directory
    /// 3. `downsort/config.toml` under the platform config directory
    /// 4. Built-in defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".downsort.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("downsort").join("config.toml");
            if user_config.exists() {
                return Self::load_from_file(&user_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Builds the extension table: built-in defaults plus `[categories]`
    /// entries, config last so it wins conflicts.
    pub fn category_map(&self) -> CategoryMap {
        let mut map = CategoryMap::new();
        for (category, extensions) in &self.categories {
            for ext in extensions {
                map.add_extension_mapping(ext, category);
            }
        }
        map
    }

    /// Builds the stability policy from the `[stability]` section.
    pub fn stability_policy(&self) -> StabilityPolicy {
        StabilityPolicy::new(
            Duration::from_millis(self.stability.poll_interval_ms),
            self.stability.max_attempts,
            &self.stability.temp_extensions,
        )
    }

    /// Compile the filter rules into optimized matcher structures.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(self.filters.clone())
    }
}

/// Compiled, optimized filter structures for efficient file matching.
///
/// Glob and regex patterns are parsed once here so per-candidate matching
/// never reparses them.
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    fn new(rules: FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = rules
            .exclude
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let include_patterns = rules
            .include
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.into_iter().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Check if a file should enter the sorting pipeline.
    ///
    /// Checks are performed in this order, with early termination:
    /// 1. Include patterns (whitelist) - if matched, always include
    /// 2. Hidden file filter - if hidden and disabled, exclude
    /// 3. Exact filename match - if matched, exclude
    /// 4. File extension match - if matched, exclude
    /// 5. Glob pattern match - if matched, exclude
    /// 6. Regex pattern match - if matched, exclude
    /// 7. Default: include
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.matches_include_patterns(file_path) {
            return true;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self.matches_exclude_patterns(file_path) {
            return false;
        }

        if self.matches_exclude_regex(&file_name) {
            return false;
        }

        true
    }

    fn matches_include_patterns(&self, file_path: &Path) -> bool {
        self.include_patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
    }

    fn matches_exclude_patterns(&self, file_path: &Path) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
    }

    fn matches_exclude_regex(&self, file_name: &str) -> bool {
        self.exclude_regexes
            .iter()
            .any(|regex| regex.is_match(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reproduce_stock_layout() {
        let config = SorterConfig::default();
        assert_eq!(config.sorter.output_dir, "Sorted");
        assert_eq!(config.sorter.log_dir, "_logs");
        assert_eq!(config.sorter.log_file, "sorted_moves.csv");
        assert!(config.sorter.notifications);
        assert_eq!(config.stability.poll_interval_ms, 200);
        assert_eq!(config.stability.max_attempts, 60);
        assert!(!config.filters.enable_hidden_files);
    }

    #[test]
    fn test_empty_toml_parses_to_defaults() {
        let config: SorterConfig = toml::from_str("").expect("parse");
        assert_eq!(config.sorter.output_dir, "Sorted");
        assert!(config.categories.is_empty());
    }

    #[test]
    fn test_partial_toml_overrides_only_named_fields() {
        let config: SorterConfig = toml::from_str(
            r#"
            [sorter]
            output_dir = "Tidy"

            [stability]
            max_attempts = 5
            "#,
        )
        .expect("parse");

        assert_eq!(config.sorter.output_dir, "Tidy");
        assert_eq!(config.sorter.log_dir, "_logs");
        assert_eq!(config.stability.max_attempts, 5);
        assert_eq!(config.stability.poll_interval_ms, 200);
    }

    #[test]
    fn test_category_overrides_extend_and_reassign() {
        let config: SorterConfig = toml::from_str(
            r#"
            [categories]
            Ebooks = ["epub", "mobi"]
            Paperwork = ["pdf"]
            "#,
        )
        .expect("parse");

        let map = config.category_map();
        assert_eq!(map.classify("book.epub"), "Ebooks");
        assert_eq!(map.classify("report.pdf"), "Paperwork");
        // Untouched defaults survive.
        assert_eq!(map.classify("movie.mkv"), "Videos");
    }

    #[test]
    fn test_hidden_file_excluded_by_default() {
        let config = SorterConfig::default();
        let compiled = config.compile_filters().unwrap();

        assert!(!compiled.should_include(Path::new(".DS_Store")));
        assert!(!compiled.should_include(Path::new(".gitignore")));
        assert!(compiled.should_include(Path::new("image.jpg")));
    }

    #[test]
    fn test_hidden_file_included_when_enabled() {
        let mut config = SorterConfig::default();
        config.filters.enable_hidden_files = true;
        let compiled = config.compile_filters().unwrap();

        assert!(compiled.should_include(Path::new(".DS_Store")));
    }

    #[test]
    fn test_exclude_exact_filename() {
        let mut config = SorterConfig::default();
        config.filters.exclude.filenames = vec!["Thumbs.db".to_string()];
        let compiled = config.compile_filters().unwrap();

        assert!(!compiled.should_include(Path::new("Thumbs.db")));
        assert!(compiled.should_include(Path::new("image.jpg")));
    }

    #[test]
    fn test_exclude_extensions_case_insensitive() {
        let mut config = SorterConfig::default();
        config.filters.exclude.extensions = vec!["bak".to_string()];
        let compiled = config.compile_filters().unwrap();

        assert!(!compiled.should_include(Path::new("file.bak")));
        assert!(!compiled.should_include(Path::new("file.BAK")));
        assert!(compiled.should_include(Path::new("file.txt")));
    }

    #[test]
    fn test_exclude_glob_patterns() {
        let mut config = SorterConfig::default();
        config.filters.exclude.patterns = vec!["*.swp".to_string()];
        let compiled = config.compile_filters().unwrap();

        assert!(!compiled.should_include(Path::new("notes.swp")));
        assert!(compiled.should_include(Path::new("notes.txt")));
    }

    #[test]
    fn test_exclude_regex() {
        let mut config = SorterConfig::default();
        config.filters.exclude.regex = vec![r"^unconfirmed.*\.bin$".to_string()];
        let compiled = config.compile_filters().unwrap();

        assert!(!compiled.should_include(Path::new("unconfirmed 12345.bin")));
        assert!(compiled.should_include(Path::new("confirmed.bin")));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let mut config = SorterConfig::default();
        config.filters.include.patterns = vec![".important".to_string()];
        let compiled = config.compile_filters().unwrap();

        // Hidden files are normally skipped, but .important is whitelisted.
        assert!(compiled.should_include(Path::new(".important")));
        assert!(!compiled.should_include(Path::new(".other")));
    }

    #[test]
    fn test_invalid_glob_pattern_rejected_at_compile() {
        let mut config = SorterConfig::default();
        config.filters.exclude.patterns = vec!["[invalid".to_string()];
        assert!(config.compile_filters().is_err());
    }

    #[test]
    fn test_invalid_regex_rejected_at_compile() {
        let mut config = SorterConfig::default();
        config.filters.exclude.regex = vec!["[invalid(".to_string()];
        assert!(config.compile_filters().is_err());
    }

    #[test]
    fn test_stability_policy_reflects_config() {
        let config: SorterConfig = toml::from_str(
            r#"
            [stability]
            poll_interval_ms = 10
            max_attempts = 3
            temp_extensions = ["opdownload"]
            "#,
        )
        .expect("parse");

        let policy = config.stability_policy();
        assert!(policy.is_temporary(Path::new("a.opdownload")));
        assert!(!policy.is_temporary(Path::new("a.crdownload")));
    }
}
