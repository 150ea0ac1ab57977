//! String-replacer filter — ordered word-list substitutions.
//!
//! This module provides:
//! * [`StringReplacerFilter`] — the [`TextFilter`] that applies the rules.
//! * [`ReplacementRule`] / [`CompiledRule`] — one `pattern → replacement`.
//! * [`WordList`] — JSON / legacy-XML word-list files.
//!
//! Rules run in list order over the *current* text, so a later rule sees
//! the output of every earlier one.
//!
//! # Quick start
//!
//! ```
//! use speech_filters::replacer::{ReplacementRule, StringReplacerFilter};
//! use speech_filters::{FilterConfig, TalkerDescriptor, TextFilter};
//!
//! let filter = StringReplacerFilter::new(
//!     "typos",
//!     FilterConfig::default(),
//!     &[ReplacementRule::word("teh", "the")],
//! );
//! let out = filter.convert("I teh best", &TalkerDescriptor::new("en"), "");
//! assert_eq!(out, "I the best");
//! assert!(filter.was_modified());
//! ```

pub mod rules;
pub mod wordlist;

pub use rules::{regex_replacement, CompiledRule, ReplacementRule};
pub use wordlist::WordList;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::filter::{FilterConfig, FilterError, TextFilter};
use crate::talker::TalkerDescriptor;

// ---------------------------------------------------------------------------
// StringReplacerFilter
// ---------------------------------------------------------------------------

/// Applies an ordered list of replacement rules, gated by language and
/// application id.
pub struct StringReplacerFilter {
    name: String,
    gate: FilterConfig,
    rules: Vec<CompiledRule>,
    modified: AtomicBool,
}

impl StringReplacerFilter {
    /// Build a filter from `rules`.
    ///
    /// Rules whose pattern does not compile are logged and dropped; the
    /// remaining rules still load.
    pub fn new(name: impl Into<String>, gate: FilterConfig, rules: &[ReplacementRule]) -> Self {
        let name = name.into();
        let compiled = rules
            .iter()
            .filter_map(|rule| match CompiledRule::compile(rule) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    log::warn!("{name}: dropping replacement rule: {e}");
                    None
                }
            })
            .collect();

        Self {
            name,
            gate,
            rules: compiled,
            modified: AtomicBool::new(false),
        }
    }

    /// Build a filter from a [`WordList`], merging the list's own language
    /// and application gates into `gate`.
    pub fn from_word_list(name: impl Into<String>, mut gate: FilterConfig, list: &WordList) -> Self {
        gate.language_codes.extend(list.language_codes.iter().cloned());
        gate.app_id_substrings.extend(list.app_ids.iter().cloned());
        Self::new(name, gate, &list.rules)
    }

    /// Load the word list at `path` and build a filter from it.
    ///
    /// # Errors
    ///
    /// Propagates [`WordList::load`] failures.
    pub fn load(name: impl Into<String>, gate: FilterConfig, path: &Path) -> Result<Self, FilterError> {
        let list = WordList::load(path)?;
        let name = name.into();
        log::debug!(
            "{name}: loaded word list `{}` ({} rules) from {}",
            list.name,
            list.rules.len(),
            path.display()
        );
        Ok(Self::from_word_list(name, gate, &list))
    }

    /// Number of rules that compiled.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Run every rule over `text`, ignoring the gate.
    pub fn apply(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc).into_owned())
    }
}

impl TextFilter for StringReplacerFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn convert(&self, text: &str, talker: &TalkerDescriptor, app_id: &str) -> String {
        if !self.gate.matches(talker, app_id) {
            self.modified.store(false, Ordering::Relaxed);
            return text.to_string();
        }

        let output = self.apply(text);
        self.modified.store(output != text, Ordering::Relaxed);
        output
    }

    fn was_modified(&self) -> bool {
        self.modified.load(Ordering::Relaxed)
    }

    fn is_sbd(&self) -> bool {
        self.gate.is_sbd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn en() -> TalkerDescriptor {
        TalkerDescriptor::new("en")
    }

    #[test]
    fn replaces_word_and_reports_modified() {
        let filter =
            StringReplacerFilter::new("t", FilterConfig::default(), &[ReplacementRule::word("teh", "the")]);
        assert_eq!(filter.convert("I teh best", &en(), ""), "I the best");
        assert!(filter.was_modified());
    }

    #[test]
    fn gated_out_language_returns_input_unchanged() {
        let gate = FilterConfig::default().with_languages(["fr"]);
        let filter = StringReplacerFilter::new("t", gate, &[ReplacementRule::word("teh", "the")]);

        assert_eq!(filter.convert("I teh best", &en(), ""), "I teh best");
        assert!(!filter.was_modified());
    }

    #[test]
    fn gated_out_app_id_returns_input_unchanged() {
        let gate = FilterConfig::default().with_app_ids(["kmail"]);
        let filter = StringReplacerFilter::new("t", gate, &[ReplacementRule::word("teh", "the")]);

        assert_eq!(filter.convert("teh", &en(), "konsole"), "teh");
        assert_eq!(filter.convert("teh", &en(), "kmail"), "the");
    }

    #[test]
    fn later_rules_see_earlier_output() {
        let rules = [
            ReplacementRule::word("KDE", "K D E"),
            ReplacementRule::regex("K D E", "the desktop"),
        ];
        let filter = StringReplacerFilter::new("t", FilterConfig::default(), &rules);
        assert_eq!(filter.apply("I use KDE"), "I use the desktop");
    }

    #[test]
    fn invalid_rule_is_dropped_rest_still_apply() {
        let rules = [
            ReplacementRule::regex("([", "x"),
            ReplacementRule::word("teh", "the"),
        ];
        let filter = StringReplacerFilter::new("t", FilterConfig::default(), &rules);
        assert_eq!(filter.rule_count(), 1);
        assert_eq!(filter.apply("teh"), "the");
    }

    #[test]
    fn unchanged_text_is_not_modified() {
        let filter =
            StringReplacerFilter::new("t", FilterConfig::default(), &[ReplacementRule::word("teh", "the")]);
        assert_eq!(filter.convert("nothing here", &en(), ""), "nothing here");
        assert!(!filter.was_modified());
    }

    #[test]
    fn word_list_gates_are_merged() {
        let list = WordList {
            language_codes: vec!["de".into()],
            rules: vec![ReplacementRule::word("z.B.", "zum Beispiel")],
            ..WordList::default()
        };
        let filter = StringReplacerFilter::from_word_list("t", FilterConfig::default(), &list);

        assert_eq!(filter.convert("z.B. so", &en(), ""), "z.B. so");
        assert_eq!(
            filter.convert("z.B. so", &TalkerDescriptor::new("de"), ""),
            "zum Beispiel so"
        );
    }
}
