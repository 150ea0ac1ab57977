//! Sentence-boundary detection — split text into speakable utterances.
//!
//! This module provides:
//! * [`SentenceBoundaryFilter`] — the asynchronous [`TextFilter`].
//! * [`BoundaryRule`] — the configurable boundary regex and replacement.
//! * [`classify`] / [`TextKind`] — SSML, code or prose.
//!
//! # Output
//!
//! Sentences are separated by a single tab:
//!
//! ```text
//! prose  "Hello world. Goodbye now."     ─▶ "Hello world.\tGoodbye now."
//! code   "a();\n\n\nb();"                ─▶ "a();\tb();"
//! ssml   "<speak><s>Hi.</s><s>Bye.</s>…" ─▶ "<speak>Hi.</speak>\t<speak>Bye.</speak>"
//! ```
//!
//! # Quick start
//!
//! ```
//! use speech_filters::sbd::{SbdSettings, SentenceBoundaryFilter};
//! use speech_filters::{FilterConfig, TalkerDescriptor, TextFilter};
//!
//! let sbd = SentenceBoundaryFilter::new("sbd", FilterConfig::default(), &SbdSettings::default())?;
//! let out = sbd.convert("Hello world. Goodbye now.", &TalkerDescriptor::new("en"), "");
//! assert_eq!(out, "Hello world.\tGoodbye now.");
//! # Ok::<(), speech_filters::FilterError>(())
//! ```

pub mod classify;
pub mod context;
pub mod escape;
pub mod markup;
pub mod prose;

pub use classify::{classify, TextKind};
pub use escape::{escape_attr, escape_text};
pub use markup::INVALID_MARKUP_TEXT;

use std::sync::{Mutex, MutexGuard, PoisonError};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::filter::{
    convert_blocking, AsyncWorker, CancelToken, FilterConfig, FilterError, FilterEvent,
    FilterState, JobOutcome, TextFilter,
};
use crate::replacer::regex_replacement;
use crate::talker::TalkerDescriptor;

/// Punctuation followed by whitespace or the end of the text.
pub const DEFAULT_SENTENCE_DELIMITER: &str = r"([.?!:;])(\s|$|(\n *\n))";

/// Keep the punctuation, replace the following whitespace with a tab.
pub const DEFAULT_SENTENCE_BOUNDARY: &str = "\\1\t";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// BoundaryRule
// ---------------------------------------------------------------------------

/// A compiled sentence-delimiter regex plus its replacement template.
#[derive(Debug, Clone)]
pub struct BoundaryRule {
    regex: Regex,
    replacement: String,
}

impl BoundaryRule {
    /// Compile `pattern`.  `replacement` may use `\1` or `${1}` group
    /// references.
    ///
    /// # Errors
    ///
    /// [`FilterError::InvalidPattern`] when `pattern` does not compile.
    pub fn new(pattern: &str, replacement: &str) -> Result<Self, FilterError> {
        let regex = Regex::new(pattern).map_err(|source| FilterError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            regex,
            replacement: regex_replacement(replacement),
        })
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Same rule with a different delimiter regex.
    fn with_pattern(&self, pattern: &str) -> Result<Self, FilterError> {
        let mut rule = Self::new(pattern, "")?;
        rule.replacement = self.replacement.clone();
        Ok(rule)
    }

    /// Mark every boundary in `text`.
    pub fn apply(&self, text: &str) -> String {
        self.regex
            .replace_all(text, self.replacement.as_str())
            .into_owned()
    }
}

impl Default for BoundaryRule {
    fn default() -> Self {
        Self {
            regex: Regex::new(DEFAULT_SENTENCE_DELIMITER).expect("valid regex"),
            replacement: regex_replacement(DEFAULT_SENTENCE_BOUNDARY),
        }
    }
}

// ---------------------------------------------------------------------------
// SbdSettings
// ---------------------------------------------------------------------------

/// Configuration of a [`SentenceBoundaryFilter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbdSettings {
    /// Regex matching a sentence end.
    #[serde(default = "default_delimiter")]
    pub sentence_delimiter_regexp: String,
    /// Replacement inserted at each match; must produce a tab.
    #[serde(default = "default_boundary")]
    pub sentence_boundary: String,
}

fn default_delimiter() -> String {
    DEFAULT_SENTENCE_DELIMITER.to_string()
}

fn default_boundary() -> String {
    DEFAULT_SENTENCE_BOUNDARY.to_string()
}

impl Default for SbdSettings {
    fn default() -> Self {
        Self {
            sentence_delimiter_regexp: default_delimiter(),
            sentence_boundary: default_boundary(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConversionJob
// ---------------------------------------------------------------------------

/// One text handed to the worker thread.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub text: String,
    pub talker: TalkerDescriptor,
    pub rule: BoundaryRule,
}

impl ConversionJob {
    /// Segment the text.  `None` when cancelled part-way.
    ///
    /// `modified` compares against the whitespace-normalised input, so a
    /// text that only had its spacing tidied counts as unmodified.
    pub fn run(&self, cancel: &CancelToken) -> Option<JobOutcome> {
        if cancel.is_cancelled() {
            return None;
        }
        let kind = classify(&self.text);
        let normalized = prose::normalize_whitespace(&self.text);
        let output = match kind {
            TextKind::Ssml => markup::segment_ssml(&normalized, &self.rule, cancel)?,
            TextKind::Code => prose::segment_code(&normalized),
            TextKind::Prose => prose::segment_prose(&normalized, &self.rule),
        };
        log::debug!(
            "sbd: {kind:?} text for {} split into {} sentence(s)",
            self.talker.full_language_code(),
            output.split('\t').count()
        );
        Some(JobOutcome {
            modified: output != normalized,
            output,
        })
    }
}

// ---------------------------------------------------------------------------
// SentenceBoundaryFilter
// ---------------------------------------------------------------------------

/// Splits text into tab-separated sentences on a worker thread.
pub struct SentenceBoundaryFilter {
    name: String,
    gate: FilterConfig,
    configured: Mutex<BoundaryRule>,
    /// One-shot regex for the next conversion only.
    override_regex: Mutex<Option<String>>,
    worker: AsyncWorker,
}

impl SentenceBoundaryFilter {
    /// Build the filter.
    ///
    /// # Errors
    ///
    /// [`FilterError::InvalidPattern`] when the configured delimiter regex
    /// does not compile.
    pub fn new(name: impl Into<String>, gate: FilterConfig, settings: &SbdSettings) -> Result<Self, FilterError> {
        let rule = BoundaryRule::new(&settings.sentence_delimiter_regexp, &settings.sentence_boundary)?;
        let name = name.into();
        Ok(Self {
            worker: AsyncWorker::new(&name),
            name,
            gate,
            configured: Mutex::new(rule),
            override_regex: Mutex::new(None),
        })
    }

    /// Replace the configured delimiter regex.  On error the previous
    /// regex stays in effect.
    pub fn set_configured_boundary_regex(&self, pattern: &str) -> Result<(), FilterError> {
        let mut configured = lock(&self.configured);
        *configured = configured.with_pattern(pattern)?;
        Ok(())
    }

    /// Replace the configured boundary replacement template.
    pub fn set_configured_boundary_replacement(&self, replacement: &str) {
        lock(&self.configured).replacement = regex_replacement(replacement);
    }

    /// Use `pattern` instead of the configured regex for the next
    /// conversion only.
    pub fn set_boundary_regex_override(&self, pattern: &str) {
        *lock(&self.override_regex) = Some(pattern.to_string());
    }

    /// Rule for a conversion starting now.  Consumes any pending override.
    fn take_rule(&self) -> BoundaryRule {
        let configured = lock(&self.configured).clone();
        let Some(pattern) = lock(&self.override_regex).take() else {
            return configured;
        };
        match configured.with_pattern(&pattern) {
            Ok(rule) => rule,
            Err(e) => {
                log::warn!("{}: ignoring boundary override: {e}", self.name);
                configured
            }
        }
    }
}

impl TextFilter for SentenceBoundaryFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn convert(&self, text: &str, talker: &TalkerDescriptor, app_id: &str) -> String {
        convert_blocking(self, text, talker, app_id)
    }

    fn was_modified(&self) -> bool {
        self.worker.was_modified()
    }

    fn supports_async(&self) -> bool {
        true
    }

    fn is_sbd(&self) -> bool {
        true
    }

    fn set_sb_regexp(&self, re: &str) {
        self.set_boundary_regex_override(re);
    }

    fn async_convert(&self, text: &str, talker: &TalkerDescriptor, app_id: &str) -> bool {
        if !self.gate.matches(talker, app_id) {
            self.worker.clear_modified();
            return false;
        }
        let job = ConversionJob {
            text: text.to_string(),
            talker: talker.clone(),
            rule: self.take_rule(),
        };
        self.worker.start(move |cancel| job.run(cancel));
        true
    }

    fn state(&self) -> FilterState {
        self.worker.state()
    }

    fn wait_for_finished(&self) {
        self.worker.wait();
    }

    fn output(&self) -> String {
        self.worker.output()
    }

    fn ack_finished(&self) {
        self.worker.ack();
    }

    fn stop_filtering(&self) {
        self.worker.stop();
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<FilterEvent>> {
        Some(self.worker.subscribe())
    }
}
