//! Lightweight XML prolog scanning.
//!
//! Filters decide whether to act on a text by looking at its root element
//! and DOCTYPE only.  Parsing a whole document for that is wasteful (and
//! fails on documents that are merely not well-formed further down), so
//! [`root_element`] and [`doctype`] scan the prolog by hand:
//!
//! ```text
//! <?xml version="1.0"?>          ← skipped
//! <!-- comment -->               ← skipped
//! <!DOCTYPE html PUBLIC "…">     ← doctype() == Some("html")
//! <html xmlns="…">               ← root_element() == Some("html")
//! ```

// ---------------------------------------------------------------------------
// Prolog
// ---------------------------------------------------------------------------

/// What the prolog scan found.
#[derive(Debug, Default, PartialEq, Eq)]
struct Prolog<'a> {
    doctype: Option<&'a str>,
    root: Option<&'a str>,
}

fn scan(text: &str) -> Prolog<'_> {
    let mut prolog = Prolog::default();
    let mut rest = text.trim_start_matches('\u{feff}');

    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("<?") {
            match after.find("?>") {
                Some(end) => rest = &after[end + 2..],
                None => return prolog,
            }
        } else if let Some(after) = rest.strip_prefix("<!--") {
            match after.find("-->") {
                Some(end) => rest = &after[end + 3..],
                None => return prolog,
            }
        } else if let Some(after) = strip_prefix_ignore_case(rest, "<!DOCTYPE") {
            let after = after.trim_start();
            let name = leading_name(after);
            if !name.is_empty() {
                prolog.doctype = Some(name);
            }
            match doctype_end(after) {
                Some(end) => rest = &after[end..],
                None => return prolog,
            }
        } else if let Some(after) = rest.strip_prefix('<') {
            let name = leading_name(after);
            if !name.is_empty() {
                prolog.root = Some(name);
            }
            return prolog;
        } else {
            return prolog;
        }
    }
}

/// Byte offset just past the `>` that closes a DOCTYPE declaration,
/// honouring an internal subset in `[ … ]`.
fn doctype_end(decl: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (idx, c) in decl.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '>') if depth == 0 => return Some(idx + 1),
            _ => {}
        }
    }
    None
}

fn leading_name(s: &str) -> &str {
    let end = s
        .char_indices()
        .find(|&(_, c)| !(c.is_alphanumeric() || matches!(c, ':' | '_' | '-' | '.')))
        .map_or(s.len(), |(idx, _)| idx);
    &s[..end]
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

/// Strip a namespace prefix: `ssml:speak` → `speak`.
fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Name of the document's top-level element, after skipping an XML
/// declaration, comments, processing instructions and a DOCTYPE.
///
/// Returns `None` for text that does not start with markup.
pub fn root_element(text: &str) -> Option<&str> {
    scan(text).root
}

/// Name declared by the document's DOCTYPE, if any.
pub fn doctype(text: &str) -> Option<&str> {
    scan(text).doctype
}

/// `true` when the top-level element is named `name` (namespace prefix
/// ignored, case-sensitive as XML is).
///
/// ```
/// use speech_filters::xml::has_root_element;
///
/// assert!(has_root_element("<?xml version=\"1.0\"?><speak>Hi</speak>", "speak"));
/// assert!(!has_root_element("Hello there", "speak"));
/// ```
pub fn has_root_element(text: &str, name: &str) -> bool {
    root_element(text).is_some_and(|root| root == name || local_name(root) == name)
}

/// `true` when the DOCTYPE declares `name` (compared case-insensitively,
/// since HTML doctypes are written both ways).
pub fn has_doctype(text: &str, name: &str) -> bool {
    doctype(text).is_some_and(|d| d.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_root_after_declaration_and_comments() {
        let text = "<?xml version=\"1.0\"?>\n<!-- a -->\n<!-- b -->\n<speak version=\"1.0\">x</speak>";
        assert_eq!(root_element(text), Some("speak"));
    }

    #[test]
    fn finds_doctype_with_internal_subset() {
        let text = "<!DOCTYPE html [ <!ENTITY x \"a > b\"> ]>\n<html><body/></html>";
        assert_eq!(doctype(text), Some("html"));
        assert_eq!(root_element(text), Some("html"));
    }

    #[test]
    fn doctype_match_ignores_case() {
        let text = "<!doctype HTML PUBLIC \"-//W3C//DTD XHTML 1.0//EN\" \"x.dtd\"><html/>";
        assert!(has_doctype(text, "html"));
    }

    #[test]
    fn plain_text_has_no_root() {
        assert_eq!(root_element("if (a < b) { return; }"), None);
        assert_eq!(root_element(""), None);
    }

    #[test]
    fn unterminated_comment_has_no_root() {
        assert_eq!(root_element("<!-- never closed <speak>"), None);
    }

    #[test]
    fn namespace_prefix_is_ignored() {
        assert!(has_root_element("<ssml:speak xmlns:ssml=\"x\"/>", "speak"));
        assert!(!has_root_element("<speaker/>", "speak"));
    }
}
