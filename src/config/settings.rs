//! Pipeline settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.
//!
//! # Example `filters.toml`
//!
//! ```toml
//! filter_ids = ["typos", "xhtml", "sbd"]
//!
//! [filters.typos]
//! kind = "string_replacer"
//! language_codes = ["en"]
//! word_list = "typos.json"
//!
//! [[filters.typos.rules]]
//! pattern = "KDE"
//! word_boundary = true
//! replacement = "K D E"
//!
//! [filters.xhtml]
//! kind = "xml_transform"
//! xslt_file = "/usr/share/speech-filters/xhtml2ssml.xsl"
//! root_elements = ["html"]
//!
//! [filters.sbd]
//! kind = "sbd"
//! is_sbd = true
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::filter::{FilterConfig, FilterError, TextFilter};
use crate::replacer::{ReplacementRule, StringReplacerFilter, WordList};
use crate::sbd::{SbdSettings, SentenceBoundaryFilter};
use crate::xml_transform::{XmlTransformFilter, XmlTransformSettings};

// ---------------------------------------------------------------------------
// ReplacerSettings
// ---------------------------------------------------------------------------

/// String-replacer settings: a word-list file, inline rules, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacerSettings {
    /// JSON or legacy-XML word list.  Its rules run before the inline ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_list: Option<PathBuf>,
    #[serde(default)]
    pub rules: Vec<ReplacementRule>,
}

// ---------------------------------------------------------------------------
// FilterKind / FilterEntry
// ---------------------------------------------------------------------------

/// Which filter a `[filters.<id>]` table describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterKind {
    StringReplacer(ReplacerSettings),
    XmlTransform(XmlTransformSettings),
    Sbd(SbdSettings),
}

/// One `[filters.<id>]` table: the common gate plus kind-specific settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterEntry {
    #[serde(flatten)]
    pub common: FilterConfig,
    #[serde(flatten)]
    pub kind: FilterKind,
}

impl FilterEntry {
    /// An enabled sentence-boundary detector with default settings.
    pub fn sbd() -> Self {
        Self {
            common: FilterConfig {
                is_sbd: true,
                ..FilterConfig::default()
            },
            kind: FilterKind::Sbd(SbdSettings::default()),
        }
    }

    /// Construct the filter this entry describes, named `id`.
    ///
    /// # Errors
    ///
    /// Whatever the filter's constructor reports; a string replacer with
    /// neither a word list nor rules is [`FilterError::NotConfigured`].
    pub fn build(&self, id: &str) -> Result<Arc<dyn TextFilter>, FilterError> {
        let gate = self.common.clone();
        let filter: Arc<dyn TextFilter> = match &self.kind {
            FilterKind::StringReplacer(settings) => Arc::new(build_replacer(id, gate, settings)?),
            FilterKind::XmlTransform(settings) => {
                Arc::new(XmlTransformFilter::new(id, gate, settings.clone()))
            }
            FilterKind::Sbd(settings) => Arc::new(SentenceBoundaryFilter::new(id, gate, settings)?),
        };
        Ok(filter)
    }
}

fn build_replacer(
    id: &str,
    gate: FilterConfig,
    settings: &ReplacerSettings,
) -> Result<StringReplacerFilter, FilterError> {
    let Some(path) = settings.word_list.as_deref() else {
        if settings.rules.is_empty() {
            return Err(FilterError::NotConfigured(format!(
                "{id}: no word list and no rules"
            )));
        }
        return Ok(StringReplacerFilter::new(id, gate, &settings.rules));
    };

    let path = AppPaths::new().word_list(path);
    let mut list = WordList::load(&path)?;
    log::debug!(
        "{id}: word list `{}` has {} rule(s), {} inline",
        list.name,
        list.rules.len(),
        settings.rules.len()
    );
    list.rules.extend(settings.rules.iter().cloned());
    Ok(StringReplacerFilter::from_word_list(id, gate, &list))
}

// ---------------------------------------------------------------------------
// PipelineConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level pipeline configuration, serialised as `filters.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use speech_filters::config::PipelineConfig;
///
/// // Load (returns Default when file is missing)
/// let config = PipelineConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Filter ids in execution order.
    #[serde(default)]
    pub filter_ids: Vec<String>,
    /// Filter settings by id.
    #[serde(default)]
    pub filters: BTreeMap<String, FilterEntry>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter_ids: vec!["sbd".into()],
            filters: BTreeMap::from([("sbd".to_string(), FilterEntry::sbd())]),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from the platform-appropriate `filters.toml`.
    ///
    /// Returns `Ok(PipelineConfig::default())` when the file does not exist
    /// yet, so callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `filters.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
