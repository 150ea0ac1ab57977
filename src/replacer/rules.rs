//! Replacement rules and their compiled form.

use std::borrow::Cow;

use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};

use crate::filter::FilterError;

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// ReplacementRule
// ---------------------------------------------------------------------------

/// One `pattern → replacement` entry of a word list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRule {
    /// Literal word (when `word_boundary`) or regular expression.
    pub pattern: String,
    /// Match `pattern` literally, anchored on word boundaries.
    #[serde(default)]
    pub word_boundary: bool,
    /// Substitution text.  Regex rules may reference groups as `\1` or `${1}`.
    pub replacement: String,
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
}

impl ReplacementRule {
    /// A literal whole-word rule.
    pub fn word(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            word_boundary: true,
            replacement: replacement.into(),
            case_sensitive: true,
        }
    }

    /// A regular-expression rule.
    pub fn regex(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            word_boundary: false,
            replacement: replacement.into(),
            case_sensitive: true,
        }
    }

    /// Builder toggle for case-insensitive matching.
    pub fn ignore_case(mut self) -> Self {
        self.case_sensitive = false;
        self
    }
}

// ---------------------------------------------------------------------------
// CompiledRule
// ---------------------------------------------------------------------------

/// A rule ready to run against text.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    regex: Regex,
    replacement: String,
    literal: bool,
}

impl CompiledRule {
    /// Compile `rule`.
    ///
    /// # Errors
    ///
    /// [`FilterError::InvalidPattern`] when the pattern is not a valid regex
    /// (or is empty).
    pub fn compile(rule: &ReplacementRule) -> Result<Self, FilterError> {
        let body = if rule.word_boundary {
            word_pattern(&rule.pattern)
        } else {
            rule.pattern.clone()
        };
        let source = if rule.case_sensitive {
            body
        } else {
            format!("(?i){body}")
        };

        if rule.pattern.is_empty() {
            return Err(FilterError::InvalidPattern {
                pattern: String::new(),
                source: regex::Error::Syntax("empty pattern".into()),
            });
        }
        let regex = Regex::new(&source).map_err(|source| FilterError::InvalidPattern {
            pattern: rule.pattern.clone(),
            source,
        })?;

        let replacement = if rule.word_boundary {
            rule.replacement.clone()
        } else {
            regex_replacement(&rule.replacement)
        };

        Ok(Self {
            regex,
            replacement,
            literal: rule.word_boundary,
        })
    }

    /// Replace every match in `text`.
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if self.literal {
            self.regex.replace_all(text, NoExpand(&self.replacement))
        } else {
            self.regex.replace_all(text, self.replacement.as_str())
        }
    }
}

/// Escape `word` and anchor it on word boundaries.
///
/// `\b` is only added next to word characters, so entries such as `C++`
/// or `:-)` still match.
fn word_pattern(word: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut pattern = String::with_capacity(word.len() + 8);
    if word.chars().next().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(word));
    if word.chars().last().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    pattern
}

/// Translate a replacement template into `regex` syntax.
///
/// `\1`…`\9` become `${1}`…`${9}` and `\\` becomes a single backslash.
/// An explicit `${N}` is kept; any other `$` is literal.
///
/// ```
/// use speech_filters::replacer::regex_replacement;
///
/// assert_eq!(regex_replacement("\\1\t"), "${1}\t");
/// assert_eq!(regex_replacement("${2}!"), "${2}!");
/// assert_eq!(regex_replacement("US$5"), "US$$5");
/// ```
pub fn regex_replacement(template: &str) -> String {
    let mut out = String::with_capacity(template.len() + 4);
    let mut rest = template;
    while let Some(c) = rest.chars().next() {
        rest = &rest[c.len_utf8()..];
        match c {
            '\\' => match rest.chars().next() {
                Some(d) if d.is_ascii_digit() => {
                    rest = &rest[1..];
                    out.push_str("${");
                    out.push(d);
                    out.push('}');
                }
                Some('\\') => {
                    rest = &rest[1..];
                    out.push('\\');
                }
                _ => out.push('\\'),
            },
            '$' => match group_reference_len(rest) {
                Some(len) => {
                    out.push('$');
                    out.push_str(&rest[..len]);
                    rest = &rest[len..];
                }
                None => out.push_str("$$"),
            },
            _ => out.push(c),
        }
    }
    out
}

/// Length of a `{N}` group number at the start of `s`.
fn group_reference_len(s: &str) -> Option<usize> {
    let digits = s.strip_prefix('{')?;
    let n = digits.bytes().take_while(u8::is_ascii_digit).count();
    (n > 0 && digits[n..].starts_with('}')).then_some(n + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(rule: ReplacementRule, text: &str) -> String {
        CompiledRule::compile(&rule).unwrap().apply(text).into_owned()
    }

    #[test]
    fn word_rule_respects_boundaries() {
        let rule = ReplacementRule::word("cat", "dog");
        assert_eq!(run(rule.clone(), "cat category cat."), "dog category dog.");
        assert_eq!(run(rule, "bobcat"), "bobcat");
    }

    #[test]
    fn word_rule_is_literal() {
        assert_eq!(run(ReplacementRule::word("C++", "C plus plus"), "I like C++."), "I like C plus plus.");
        assert_eq!(run(ReplacementRule::word("a.b", "x"), "axb a.b"), "axb x");
        assert_eq!(run(ReplacementRule::word("cost", "$1"), "cost"), "$1");
    }

    #[test]
    fn regex_rule_matches_anywhere_with_backrefs() {
        let rule = ReplacementRule::regex(r"(\d+)%", r"\1 percent");
        assert_eq!(run(rule, "up 50% today"), "up 50 percent today");
        assert_eq!(run(ReplacementRule::regex("cat", "dog"), "category"), "dogegory");
    }

    #[test]
    fn ignore_case_rule() {
        let rule = ReplacementRule::word("kde", "K D E").ignore_case();
        assert_eq!(run(rule, "KDE and kde"), "K D E and K D E");
    }

    #[test]
    fn invalid_and_empty_patterns_fail_to_compile() {
        assert!(CompiledRule::compile(&ReplacementRule::regex("([a-z", "x")).is_err());
        assert!(CompiledRule::compile(&ReplacementRule::regex("", "x")).is_err());
    }

    #[test]
    fn replacement_template_translation() {
        assert_eq!(regex_replacement(r"\1\2"), "${1}${2}");
        assert_eq!(regex_replacement(r"a\\b"), r"a\b");
        assert_eq!(regex_replacement(r"trailing\"), r"trailing\");
        assert_eq!(regex_replacement("$1 ${x} ${12}"), "$$1 $${x} ${12}");
    }

    #[test]
    fn dollar_signs_in_templates_are_literal() {
        assert_eq!(
            run(ReplacementRule::regex(r"USD (\d+)", r"$\1"), "costs USD 5 now"),
            "costs $5 now"
        );
        assert_eq!(run(ReplacementRule::regex("dollars", "US$5"), "five dollars"), "five US$5");
        assert_eq!(run(ReplacementRule::regex(r"(\w+)@", "${1} at "), "me@"), "me at ");
    }
}
