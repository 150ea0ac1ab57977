//! Cross-platform configuration paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (pipeline settings + word lists):
//!   Windows: %APPDATA%\speech-filters\
//!   macOS:   ~/Library/Application Support/speech-filters/
//!   Linux:   ~/.config/speech-filters/

use std::path::{Path, PathBuf};

/// Holds all resolved configuration directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `filters.toml` and the word lists.
    pub config_dir: PathBuf,
    /// Full path to `filters.toml`.
    pub settings_file: PathBuf,
    /// Directory searched for relative word-list paths.
    pub word_lists_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "speech-filters";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("filters.toml"),
            word_lists_dir: config_dir.join("wordlists"),
            config_dir,
        }
    }

    /// Resolve a configured word-list path.  Relative paths that do not
    /// exist as given are looked up in [`word_lists_dir`](Self::word_lists_dir).
    pub fn word_list(&self, configured: &Path) -> PathBuf {
        if configured.is_relative() && !configured.exists() {
            self.word_lists_dir.join(configured)
        } else {
            configured.to_path_buf()
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
