//! The filter contract shared by every pipeline stage.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    TextFilter (trait)                      │
//! │                                                            │
//! │  sync:   convert(text, talker, app_id) -> String           │
//! │  async:  async_convert() -> bool                           │
//! │          state() / wait_for_finished() / output()          │
//! │          ack_finished() / stop_filtering() / subscribe()   │
//! │                                                            │
//! │  gate:   FilterConfig (language codes, app-id substrings)  │
//! │  worker: AsyncWorker (dedicated thread + cancel flag)      │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Filters are `Send + Sync` and take `&self` everywhere so one instance
//! can sit behind an `Arc<dyn TextFilter>` in the pipeline while another
//! thread calls [`TextFilter::stop_filtering`] on it.

pub mod gate;
pub mod worker;

pub use gate::FilterConfig;
pub use worker::{AsyncWorker, CancelToken, JobOutcome};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::talker::TalkerDescriptor;

// ---------------------------------------------------------------------------
// FilterError
// ---------------------------------------------------------------------------

/// Errors raised while constructing a filter.
///
/// Conversions themselves never fail: a filter that cannot process a text
/// returns it unchanged.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A replacement rule or boundary pattern did not compile.
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A word-list file could not be read.
    #[error("cannot read word list {path}: {source}")]
    WordListIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A word-list file was read but its contents are not understood.
    #[error("cannot parse word list {path}: {reason}")]
    WordListParse { path: String, reason: String },

    /// Required configuration is absent.
    #[error("filter is not configured: {0}")]
    NotConfigured(String),
}

// ---------------------------------------------------------------------------
// FilterState / FilterEvent
// ---------------------------------------------------------------------------

/// Processing state of an asynchronous filter.
///
/// ```text
/// Idle ──async_convert──▶ Filtering ──worker done──▶ Finished ──ack_finished──▶ Idle
///                         Filtering ──stop_filtering──▶ Idle   (emits Stopped)
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FilterState {
    /// No conversion in progress and no output buffered.
    #[default]
    Idle,
    /// A worker is processing the text.
    Filtering,
    /// Output is ready to be read with [`TextFilter::output`].
    Finished,
}

impl FilterState {
    /// A short human-readable label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            FilterState::Idle => "Idle",
            FilterState::Filtering => "Filtering",
            FilterState::Finished => "Finished",
        }
    }
}

/// Completion notifications published by asynchronous filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterEvent {
    /// The worker finished and output is available.
    Finished,
    /// The worker unwound after [`TextFilter::stop_filtering`]; no output.
    Stopped,
}

// ---------------------------------------------------------------------------
// TextFilter trait
// ---------------------------------------------------------------------------

/// One stage of the filter pipeline.
///
/// Synchronous filters implement [`convert`](TextFilter::convert) only.
/// Asynchronous filters return `true` from
/// [`supports_async`](TextFilter::supports_async) and implement the
/// `async_convert` family; the pipeline then blocks on
/// [`wait_for_finished`](TextFilter::wait_for_finished) before reading
/// the output.
pub trait TextFilter: Send + Sync {
    /// Identifier used in log lines.
    fn name(&self) -> &str;

    /// Convert `text` synchronously.  Returns the input unchanged when the
    /// filter's gate does not match.
    fn convert(&self, text: &str, talker: &TalkerDescriptor, app_id: &str) -> String;

    /// Did the most recent conversion change the text?
    fn was_modified(&self) -> bool;

    /// `true` for filters that prefer [`async_convert`](TextFilter::async_convert).
    fn supports_async(&self) -> bool {
        false
    }

    /// `true` for sentence-boundary detectors.
    fn is_sbd(&self) -> bool {
        false
    }

    /// One-shot sentence-boundary regex override for the next conversion.
    fn set_sb_regexp(&self, _re: &str) {}

    /// Start converting in the background.  Returns `false` (and does not
    /// change state) when the gate does not match.
    fn async_convert(&self, _text: &str, _talker: &TalkerDescriptor, _app_id: &str) -> bool {
        false
    }

    /// Current processing state.
    fn state(&self) -> FilterState {
        FilterState::Idle
    }

    /// Block until the in-flight conversion finishes or is stopped.
    fn wait_for_finished(&self) {}

    /// Output of the last finished conversion (empty unless `Finished`).
    fn output(&self) -> String {
        String::new()
    }

    /// Discard buffered output and return to `Idle`.
    fn ack_finished(&self) {}

    /// Cancel the in-flight conversion without waiting for it.
    fn stop_filtering(&self) {}

    /// Receive [`FilterEvent`]s for every subsequent conversion.
    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<FilterEvent>> {
        None
    }
}

/// Run `filter` through its asynchronous interface and block for the result.
///
/// Returns `text` unchanged when the filter declines the conversion or is
/// stopped before it finishes.
pub fn convert_blocking(
    filter: &dyn TextFilter,
    text: &str,
    talker: &TalkerDescriptor,
    app_id: &str,
) -> String {
    if !filter.async_convert(text, talker, app_id) {
        return text.to_string();
    }
    collect_output(filter, text)
}

/// Wait for a conversion started with [`TextFilter::async_convert`] and
/// take its output, or `text` when it was stopped.
pub fn collect_output(filter: &dyn TextFilter, text: &str) -> String {
    filter.wait_for_finished();
    if filter.state() != FilterState::Finished {
        return text.to_string();
    }
    let output = filter.output();
    filter.ack_finished();
    output
}

// Compile-time assertion: Box<dyn TextFilter> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn TextFilter>) {}
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle() {
        assert_eq!(FilterState::default(), FilterState::Idle);
        assert_eq!(FilterState::Filtering.label(), "Filtering");
    }

    #[test]
    fn invalid_pattern_error_names_the_pattern() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = FilterError::InvalidPattern {
            pattern: "(".into(),
            source,
        };
        assert!(err.to_string().contains("`(`"), "unexpected message: {err}");
    }
}
