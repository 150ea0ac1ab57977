//! Per-filter configuration and the language / application-id gate.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::talker::TalkerDescriptor;

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// FilterConfig
// ---------------------------------------------------------------------------

/// Settings common to every filter.
///
/// Empty `language_codes` / `app_ids` sets match everything.  When both are
/// non-empty, both must match for the filter to act.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Disabled filters are never added to a pipeline.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Marks a sentence-boundary detector.
    #[serde(default)]
    pub is_sbd: bool,
    /// Language codes (`"en"` or `"en_US"`) the filter applies to.
    #[serde(default)]
    pub language_codes: BTreeSet<String>,
    /// Substrings of the caller's application id the filter applies to.
    #[serde(default, rename = "app_ids")]
    pub app_id_substrings: BTreeSet<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            is_sbd: false,
            language_codes: BTreeSet::new(),
            app_id_substrings: BTreeSet::new(),
        }
    }
}

impl FilterConfig {
    /// Restrict the filter to the given language codes.
    pub fn with_languages<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.language_codes.extend(codes.into_iter().map(Into::into));
        self
    }

    /// Restrict the filter to application ids containing one of `ids`.
    pub fn with_app_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.app_id_substrings.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Does the talker's language pass the gate?
    ///
    /// An entry matches either the bare language (`"en"`) or the full
    /// `lang_COUNTRY` code (`"en_US"`).
    pub fn matches_language(&self, talker: &TalkerDescriptor) -> bool {
        if self.language_codes.is_empty() {
            return true;
        }
        let full = talker.full_language_code();
        self.language_codes
            .iter()
            .any(|code| code == &talker.language_code || code == &full)
    }

    /// Does the application id pass the gate?
    pub fn matches_app_id(&self, app_id: &str) -> bool {
        self.app_id_substrings.is_empty()
            || self
                .app_id_substrings
                .iter()
                .any(|needle| !needle.is_empty() && app_id.contains(needle.as_str()))
    }

    /// The full gating predicate.
    pub fn matches(&self, talker: &TalkerDescriptor, app_id: &str) -> bool {
        self.matches_language(talker) && self.matches_app_id(app_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_gate_matches_everything() {
        let gate = FilterConfig::default();
        assert!(gate.matches(&TalkerDescriptor::new("ja"), ""));
        assert!(gate.matches(&TalkerDescriptor::default(), "konsole"));
    }

    #[test]
    fn language_gate_matches_bare_or_full_code() {
        let gate = FilterConfig::default().with_languages(["en"]);
        assert!(gate.matches_language(&TalkerDescriptor::new("en_US")));
        assert!(!gate.matches_language(&TalkerDescriptor::new("fr")));

        let gate = FilterConfig::default().with_languages(["en_GB"]);
        assert!(gate.matches_language(&TalkerDescriptor::new("en_GB")));
        assert!(!gate.matches_language(&TalkerDescriptor::new("en_US")));
    }

    #[test]
    fn app_id_gate_matches_substrings() {
        let gate = FilterConfig::default().with_app_ids(["kmail"]);
        assert!(gate.matches_app_id("org.kde.kmail2"));
        assert!(!gate.matches_app_id("konqueror"));
    }

    #[test]
    fn both_gates_must_match() {
        let gate = FilterConfig::default()
            .with_languages(["de"])
            .with_app_ids(["kate"]);
        assert!(gate.matches(&TalkerDescriptor::new("de"), "kate"));
        assert!(!gate.matches(&TalkerDescriptor::new("de"), "kwrite"));
        assert!(!gate.matches(&TalkerDescriptor::new("en"), "kate"));
    }
}
