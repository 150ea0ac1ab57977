//! Whitespace normalisation and plain-text sentence splitting.
//!
//! ```text
//! "Hello  world. Goodbye\nnow."
//!   normalize_whitespace   → "Hello world. Goodbye\nnow."
//!   boundary regex         → "Hello world.\tGoodbye\nnow.\t"
//!   newlines → spaces      → "Hello world.\tGoodbye now.\t"
//!   tab/space collapsing   → (unchanged)
//!   trim (segment_prose)   → "Hello world.\tGoodbye now."
//! ```

use std::sync::LazyLock;

use regex::Regex;

use super::BoundaryRule;

static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\x0C]+").expect("valid regex"));
static TAB_THEN_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\t +").expect("valid regex"));
static SPACES_THEN_TAB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" +\t").expect("valid regex"));
static TAB_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\t\t+").expect("valid regex"));

/// Collapse runs of spaces, tabs and form feeds into one space.
pub fn normalize_whitespace(text: &str) -> String {
    BLANK_RUN.replace_all(text, " ").into_owned()
}

/// Collapse `"\t  "`, `"  \t"` and `"\t\t"` into a single tab.
fn collapse_tabs(text: &str) -> String {
    let text = TAB_THEN_SPACES.replace_all(text, "\t");
    let text = SPACES_THEN_TAB.replace_all(&text, "\t");
    TAB_RUN.replace_all(&text, "\t").into_owned()
}

fn newlines_to(text: &str, with: &str) -> String {
    text.replace("\r\n", "\n").replace(['\n', '\r'], with)
}

fn trim_boundaries(text: &str) -> String {
    text.trim_matches([' ', '\t']).to_string()
}

/// Apply the boundary rule and tidy the result, keeping any leading or
/// trailing tab.
///
/// A trailing tab means the text ended exactly on a sentence boundary; the
/// SSML path relies on seeing it.
pub fn split_sentences(text: &str, rule: &BoundaryRule) -> String {
    let marked = rule.apply(text);
    collapse_tabs(&newlines_to(&marked, " "))
}

/// Prose: split on the boundary rule.  Returns tab-separated sentences.
pub fn segment_prose(text: &str, rule: &BoundaryRule) -> String {
    trim_boundaries(&split_sentences(text, rule))
}

/// Source code: every line is its own sentence; blank lines disappear.
pub fn segment_code(text: &str) -> String {
    trim_boundaries(&collapse_tabs(&newlines_to(text, "\t")))
}
