//! Word-list files for the string replacer.
//!
//! Two on-disk formats are understood:
//!
//! * **JSON** (`*.json`) — a serialised [`WordList`]:
//!
//!   ```json
//!   { "name": "Typos", "language_codes": ["en"], "app_ids": [],
//!     "rules": [ { "pattern": "teh", "word_boundary": true, "replacement": "the" } ] }
//!   ```
//!
//! * **XML** (anything else) — the legacy `<wordlist>` format:
//!
//!   ```xml
//!   <wordlist>
//!     <name>Typos</name>
//!     <language-code>en</language-code>
//!     <appid>kmail,kate</appid>
//!     <case-sensitive>false</case-sensitive>
//!     <word><type>Word</type><match>teh</match><subst>the</subst></word>
//!     <word><type>RegExp</type><match>(\d+)%</match><subst>\1 percent</subst></word>
//!   </wordlist>
//!   ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::rules::ReplacementRule;
use crate::filter::FilterError;

// ---------------------------------------------------------------------------
// WordList
// ---------------------------------------------------------------------------

/// A named, optionally gated list of replacement rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordList {
    #[serde(default)]
    pub name: String,
    /// Extra language gate contributed by the list itself.
    #[serde(default)]
    pub language_codes: Vec<String>,
    /// Extra application-id gate contributed by the list itself.
    #[serde(default)]
    pub app_ids: Vec<String>,
    #[serde(default)]
    pub rules: Vec<ReplacementRule>,
}

impl WordList {
    /// Load a word list, picking the format from the file extension.
    ///
    /// # Errors
    ///
    /// [`FilterError::WordListIo`] when the file cannot be read and
    /// [`FilterError::WordListParse`] when its contents are malformed.
    pub fn load(path: &Path) -> Result<Self, FilterError> {
        let data = std::fs::read_to_string(path).map_err(|source| FilterError::WordListIo {
            path: path.display().to_string(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str(&data).map_err(|e| e.to_string())
        } else {
            Self::from_xml(&data)
        };

        parsed.map_err(|reason| FilterError::WordListParse {
            path: path.display().to_string(),
            reason,
        })
    }

    /// Parse the legacy XML word-list format.
    pub fn from_xml(data: &str) -> Result<Self, String> {
        let doc = roxmltree::Document::parse(data).map_err(|e| e.to_string())?;
        let root = doc.root_element();
        if root.tag_name().name() != "wordlist" {
            return Err(format!(
                "expected <wordlist> root, found <{}>",
                root.tag_name().name()
            ));
        }

        let mut list = WordList::default();
        let mut case_sensitive = true;

        for child in root.children().filter(|n| n.is_element()) {
            let text = child.text().unwrap_or_default().trim();
            match child.tag_name().name() {
                "name" => list.name = text.to_string(),
                "language-code" | "language_code" => list.language_codes.extend(split_list(text)),
                "appid" | "app_id" => list.app_ids.extend(split_list(text)),
                "case-sensitive" | "case_sensitive" => {
                    case_sensitive = matches!(text, "true" | "1" | "yes");
                }
                "word" => list.rules.push(parse_word(child)?),
                other => log::debug!("word list: ignoring <{other}>"),
            }
        }

        for rule in &mut list.rules {
            rule.case_sensitive = case_sensitive;
        }
        Ok(list)
    }
}

fn split_list(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_word(word: roxmltree::Node<'_, '_>) -> Result<ReplacementRule, String> {
    let field = |name: &str| {
        word.children()
            .find(|n| n.has_tag_name(name))
            .map(|n| n.text().unwrap_or_default().to_string())
    };

    let pattern = field("match").ok_or("<word> without <match>")?;
    let replacement = field("subst").unwrap_or_default();
    let word_boundary = match field("type").as_deref().map(str::trim) {
        None | Some("Word") | Some("word") => true,
        Some("RegExp") | Some("regexp") => false,
        Some(other) => return Err(format!("unknown word type `{other}`")),
    };

    Ok(ReplacementRule {
        pattern,
        word_boundary,
        replacement,
        case_sensitive: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const XML_LIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wordlist>
  <name>Typos</name>
  <language-code>en</language-code>
  <appid>kmail, kate</appid>
  <case-sensitive>false</case-sensitive>
  <word><type>Word</type><match>teh</match><subst>the</subst></word>
  <word><type>RegExp</type><match>(\d+)%</match><subst>\1 percent</subst></word>
</wordlist>"#;

    #[test]
    fn parses_legacy_xml() {
        let list = WordList::from_xml(XML_LIST).unwrap();
        assert_eq!(list.name, "Typos");
        assert_eq!(list.language_codes, vec!["en"]);
        assert_eq!(list.app_ids, vec!["kmail", "kate"]);
        assert_eq!(list.rules.len(), 2);
        assert!(list.rules[0].word_boundary);
        assert!(!list.rules[1].word_boundary);
        assert_eq!(list.rules[1].replacement, r"\1 percent");
        assert!(list.rules.iter().all(|r| !r.case_sensitive));
    }

    #[test]
    fn rejects_wrong_root_and_unknown_type() {
        assert!(WordList::from_xml("<words/>").is_err());
        assert!(WordList::from_xml(
            "<wordlist><word><type>Glob</type><match>x</match></word></wordlist>"
        )
        .is_err());
    }

    #[test]
    fn loads_json_from_disk() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("typos.json");
        let list = WordList {
            name: "Typos".into(),
            rules: vec![ReplacementRule::word("teh", "the")],
            ..WordList::default()
        };
        std::fs::write(&path, serde_json::to_string_pretty(&list).unwrap()).unwrap();

        assert_eq!(WordList::load(&path).unwrap(), list);
    }

    #[test]
    fn loads_xml_from_disk() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("typos.xml");
        std::fs::write(&path, XML_LIST).unwrap();

        assert_eq!(WordList::load(&path).unwrap().rules.len(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().expect("temp dir");
        let err = WordList::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, FilterError::WordListIo { .. }));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            WordList::load(&path).unwrap_err(),
            FilterError::WordListParse { .. }
        ));
    }
}
