//! Deciding whether a text is SSML, source code or prose.

use std::sync::LazyLock;

use regex::Regex;

use crate::xml;

/// Only this many leading characters are inspected for code hints.
pub const CODE_SNIFF_CHARS: usize = 500;

static CODE_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)/\*|\bif\s*\(|^[ \t]*#include\b").expect("valid regex")
});

/// The three ways the sentence-boundary detector treats input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    /// A document whose root element is `<speak>`.
    Ssml,
    /// Something that looks like C-family source code.
    Code,
    /// Everything else.
    Prose,
}

/// Classify `text`.
///
/// ```
/// use speech_filters::sbd::{classify, TextKind};
///
/// assert_eq!(classify("<speak>Hi.</speak>"), TextKind::Ssml);
/// assert_eq!(classify("#include <stdio.h>\nint main();"), TextKind::Code);
/// assert_eq!(classify("Hello world."), TextKind::Prose);
/// ```
pub fn classify(text: &str) -> TextKind {
    if xml::has_root_element(text, "speak") {
        return TextKind::Ssml;
    }
    if CODE_HINT.is_match(leading_chars(text, CODE_SNIFF_CHARS)) {
        return TextKind::Code;
    }
    TextKind::Prose
}

/// The first `n` characters of `text` (not bytes).
fn leading_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
