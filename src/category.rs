/// Extension-to-category mapping for sorting downloaded files.
///
/// This module decides which destination folder a file belongs to, based on
/// nothing but its name. Classification must be a pure, total function so the
/// watch loop and the batch sweep always agree on a destination.
///
/// # Examples
///
/// ```
/// use downsort::category::CategoryMap;
///
/// let map = CategoryMap::new();
/// assert_eq!(map.classify("report.PDF"), "PDFs");
/// assert_eq!(map.classify("movie.mkv"), "Videos");
/// assert_eq!(map.classify("mystery.xyz"), "Misc");
/// ```
use std::collections::HashMap;

/// Category assigned to files whose extension is not mapped anywhere.
pub const FALLBACK_CATEGORY: &str = "Misc";

/// Built-in extension table. Every extension appears under exactly one
/// category; the fallback category has no explicit extensions.
const DEFAULT_TABLE: &[(&str, &[&str])] = &[
    ("PDFs", &["pdf"]),
    (
        "Images",
        &["png", "jpg", "jpeg", "tiff", "webp", "gif", "svg", "heic"],
    ),
    ("Videos", &["mp4", "mkv", "mov"]),
    ("Audio", &["mp3", "wav", "flac"]),
    (
        "Documents",
        &["docx", "doc", "pptx", "xlsx", "csv", "txt", "rtf", "md"],
    ),
    ("Archives", &["zip", "rar", "7z", "tar", "gz"]),
    ("Installers", &["exe", "msi", "apk", "jar", "bat", "reg"]),
    (
        "Code",
        &[
            "js", "c", "java", "py", "json", "xml", "yml", "css", "html", "pem", "ini", "lock",
            "key",
        ],
    ),
    (
        "GameData",
        &[
            "pak",
            "bin",
            "mca",
            "dat",
            "dat_old",
            "asi",
            "node",
            "dll",
            "0",
            "1",
            "sig",
            "asar",
            "mcmeta",
            "recipe",
            "exp",
            "iobj",
            "ipdb",
            "lib",
            "filters",
            "vcxproj",
            "lastbuildstate",
            "md5",
            "tlog",
            "cv",
        ],
    ),
];

/// Maps file extensions to category names.
///
/// Built once at startup and never mutated afterwards; the watch loop and the
/// sweep both hold it by reference. Categories are plain strings rather than a
/// closed enum because the configuration file may introduce new ones.
#[derive(Debug, Clone)]
pub struct CategoryMap {
    extension_map: HashMap<String, String>,
    category_names: Vec<String>,
}

impl CategoryMap {
    /// Creates a map populated with the built-in extension table.
    pub fn new() -> Self {
        let mut map = Self {
            extension_map: HashMap::new(),
            category_names: Vec::new(),
        };
        for (category, extensions) in DEFAULT_TABLE {
            for ext in *extensions {
                map.add_extension_mapping(ext, category);
            }
        }
        // The fallback exists as a destination folder even though no
        // extension maps to it explicitly.
        map.category_names.push(FALLBACK_CATEGORY.to_string());
        map
    }

    /// Adds or reassigns an extension mapping. Last writer wins, so an
    /// extension can never belong to two categories at once.
    pub fn add_extension_mapping(&mut self, ext: &str, category: &str) {
        if !self.category_names.iter().any(|c| c == category) {
            self.category_names.push(category.to_string());
        }
        self.extension_map
            .insert(ext.to_lowercase(), category.to_string());
    }

    /// Maps a bare extension (without the dot) to a category name.
    pub fn extension_to_category(&self, ext: &str) -> Option<&str> {
        self.extension_map
            .get(&ext.to_lowercase())
            .map(String::as_str)
    }

    /// Returns the destination category for a file name.
    ///
    /// The extension is the text after the last '.' in the name, lowercased;
    /// a name with no extension (including dotfiles like `.bashrc`) yields
    /// the empty string and falls through to [`FALLBACK_CATEGORY`].
    pub fn classify(&self, file_name: &str) -> &str {
        let ext = extension_of(file_name);
        self.extension_to_category(&ext)
            .unwrap_or(FALLBACK_CATEGORY)
    }

    /// All known category names, in table order, fallback last.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.category_names.iter().map(String::as_str)
    }
}

impl Default for CategoryMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts the lowercased extension from a file name, or an empty string.
fn extension_of(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_extensions() {
        let map = CategoryMap::new();
        assert_eq!(map.classify("report.pdf"), "PDFs");
        assert_eq!(map.classify("photo.jpeg"), "Images");
        assert_eq!(map.classify("movie.mkv"), "Videos");
        assert_eq!(map.classify("song.flac"), "Audio");
        assert_eq!(map.classify("notes.md"), "Documents");
        assert_eq!(map.classify("backup.7z"), "Archives");
        assert_eq!(map.classify("setup.msi"), "Installers");
        assert_eq!(map.classify("script.py"), "Code");
        assert_eq!(map.classify("world.mca"), "GameData");
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        let map = CategoryMap::new();
        assert_eq!(map.classify("REPORT.PDF"), "PDFs");
        assert_eq!(map.classify("Photo.JpG"), "Images");
    }

    #[test]
    fn test_unmapped_extension_falls_back_to_misc() {
        let map = CategoryMap::new();
        assert_eq!(map.classify("mystery.xyz"), FALLBACK_CATEGORY);
        assert_eq!(map.classify("weird.blob"), FALLBACK_CATEGORY);
    }

    #[test]
    fn test_no_extension_falls_back_to_misc() {
        let map = CategoryMap::new();
        assert_eq!(map.classify("README"), FALLBACK_CATEGORY);
        assert_eq!(map.classify(".bashrc"), FALLBACK_CATEGORY);
        assert_eq!(map.classify("trailing."), FALLBACK_CATEGORY);
    }

    #[test]
    fn test_compound_extension_uses_last_segment() {
        let map = CategoryMap::new();
        assert_eq!(map.classify("archive.tar.gz"), "Archives");
    }

    #[test]
    fn test_classify_is_deterministic() {
        let map = CategoryMap::new();
        for _ in 0..3 {
            assert_eq!(map.classify("a.pdf"), "PDFs");
        }
    }

    #[test]
    fn test_custom_mapping_wins_over_default() {
        let mut map = CategoryMap::new();
        map.add_extension_mapping("pdf", "Paperwork");
        assert_eq!(map.classify("report.pdf"), "Paperwork");
        assert!(map.categories().any(|c| c == "Paperwork"));
    }

    #[test]
    fn test_categories_include_fallback() {
        let map = CategoryMap::new();
        let names: Vec<_> = map.categories().collect();
        assert!(names.contains(&"Misc"));
        assert!(names.contains(&"PDFs"));
        assert!(names.contains(&"GameData"));
    }
}
