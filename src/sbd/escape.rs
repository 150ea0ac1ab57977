//! Re-escaping text and attribute values when SSML is re-serialised.

use std::borrow::Cow;

/// Entities left alone when they already appear in text.
const KNOWN_ENTITIES: [&str; 2] = ["&amp;", "&lt;"];

/// Escape character data: `&` becomes `&amp;` and `<` becomes `&lt;`.
///
/// An `&` that already starts `&amp;` or `&lt;` is kept, so text that was
/// escaped once is not escaped again.
///
/// ```
/// use speech_filters::sbd::escape_text;
///
/// assert_eq!(escape_text("a < b & c"), "a &lt; b &amp; c");
/// assert_eq!(escape_text("fish &amp; chips"), "fish &amp; chips");
/// ```
pub fn escape_text(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for (idx, c) in text.char_indices() {
        match c {
            '&' if KNOWN_ENTITIES.iter().any(|e| text[idx..].starts_with(e)) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Escape an attribute value for a double-quoted attribute.
pub fn escape_attr(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '"']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_borrowed() {
        assert!(matches!(escape_text("hello"), Cow::Borrowed("hello")));
    }

    #[test]
    fn escapes_bare_ampersand_and_less_than() {
        assert_eq!(escape_text("R&D <now>"), "R&amp;D &lt;now>");
    }

    #[test]
    fn existing_entities_are_not_doubled() {
        assert_eq!(escape_text("&amp; &lt; &gt;"), "&amp; &lt; &amp;gt;");
    }

    #[test]
    fn attribute_quotes_are_escaped() {
        assert_eq!(escape_attr(r#"say "hi" & <go>"#), "say &quot;hi&quot; &amp; &lt;go>");
    }
}
