//! Inherited SSML context while walking a `<speak>` document.
//!
//! Every structural element (`speak`, `voice`, `prosody`, `emphasis`,
//! `s`/`p`) overrides the attributes it carries and inherits the rest from
//! its parent.  Contexts are cloned on the way down the tree, so leaving
//! an element restores the outer context automatically and nothing leaks
//! from one sibling into the next.

use std::fmt::Write as _;

use roxmltree::Node;

use super::escape::escape_attr;

/// Level used for `<emphasis>` without a `level` attribute.
pub const DEFAULT_EMPHASIS_LEVEL: &str = "moderate";

/// How the walker treats an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Speak,
    Voice,
    Prosody,
    Emphasis,
    /// `s`, `p`, `sentence` or `paragraph`.
    Sentence,
    Break,
    /// Anything else; its children are walked, the tag itself is dropped.
    Other,
}

impl ElementKind {
    /// Classify an element by local name.
    pub fn of(local_name: &str) -> Self {
        match local_name {
            "speak" => ElementKind::Speak,
            "voice" => ElementKind::Voice,
            "prosody" => ElementKind::Prosody,
            "emphasis" => ElementKind::Emphasis,
            "s" | "p" | "sentence" | "paragraph" => ElementKind::Sentence,
            "break" => ElementKind::Break,
            _ => ElementKind::Other,
        }
    }
}

/// Attribute value by local name, so `xml:lang` is found as `lang`.
pub fn attribute(node: Node<'_, '_>, local_name: &str) -> Option<String> {
    node.attributes()
        .find(|a| a.name() == local_name)
        .map(|a| a.value().to_string())
}

fn inherit(field: &mut String, node: Node<'_, '_>, local_name: &str) {
    if let Some(value) = attribute(node, local_name) {
        *field = value;
    }
}

/// `<tag k="v" …>` for the non-empty attributes, or `None` when all are empty.
fn open_tag(tag: &str, attrs: &[(&str, &str)]) -> Option<String> {
    let mut out = format!("<{tag}");
    let mut any = false;
    for (key, value) in attrs.iter().filter(|(_, v)| !v.is_empty()) {
        let _ = write!(out, " {key}=\"{}\"", escape_attr(value));
        any = true;
    }
    out.push('>');
    any.then_some(out)
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeakFrame {
    pub lang: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceFrame {
    pub lang: String,
    pub gender: String,
    pub age: String,
    pub name: String,
    pub variant: String,
}

impl VoiceFrame {
    fn open_tag(&self) -> Option<String> {
        open_tag(
            "voice",
            &[
                ("xml:lang", self.lang.as_str()),
                ("gender", self.gender.as_str()),
                ("age", self.age.as_str()),
                ("name", self.name.as_str()),
                ("variant", self.variant.as_str()),
            ],
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProsodyFrame {
    pub pitch: String,
    pub contour: String,
    pub range: String,
    pub rate: String,
    pub duration: String,
    pub volume: String,
}

impl ProsodyFrame {
    fn open_tag(&self) -> Option<String> {
        open_tag(
            "prosody",
            &[
                ("pitch", self.pitch.as_str()),
                ("contour", self.contour.as_str()),
                ("range", self.range.as_str()),
                ("rate", self.rate.as_str()),
                ("duration", self.duration.as_str()),
                ("volume", self.volume.as_str()),
            ],
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmphasisFrame {
    pub level: String,
}

/// Paragraph or sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentenceFrame {
    pub lang: String,
}

// ---------------------------------------------------------------------------
// SsmlContext
// ---------------------------------------------------------------------------

/// The attributes in effect at one point of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsmlContext {
    pub speak: SpeakFrame,
    pub voice: VoiceFrame,
    pub prosody: ProsodyFrame,
    pub emphasis: EmphasisFrame,
    pub sentence: SentenceFrame,
}

impl SsmlContext {
    /// The context inside `node`, which is an element of kind `kind`.
    pub fn entered(&self, kind: ElementKind, node: Node<'_, '_>) -> Self {
        let mut ctx = self.clone();
        match kind {
            ElementKind::Speak => inherit(&mut ctx.speak.lang, node, "lang"),
            ElementKind::Voice => {
                let v = &mut ctx.voice;
                inherit(&mut v.lang, node, "lang");
                inherit(&mut v.gender, node, "gender");
                inherit(&mut v.age, node, "age");
                inherit(&mut v.name, node, "name");
                inherit(&mut v.variant, node, "variant");
            }
            ElementKind::Prosody => {
                let p = &mut ctx.prosody;
                inherit(&mut p.pitch, node, "pitch");
                inherit(&mut p.contour, node, "contour");
                inherit(&mut p.range, node, "range");
                inherit(&mut p.rate, node, "rate");
                inherit(&mut p.duration, node, "duration");
                inherit(&mut p.volume, node, "volume");
            }
            ElementKind::Emphasis => {
                ctx.emphasis.level =
                    attribute(node, "level").unwrap_or_else(|| DEFAULT_EMPHASIS_LEVEL.to_string());
            }
            ElementKind::Sentence => inherit(&mut ctx.sentence.lang, node, "lang"),
            ElementKind::Break | ElementKind::Other => {}
        }
        ctx
    }

    /// Language for an emitted `<speak>`: the innermost `s`/`p` language,
    /// else the document's.
    pub fn language(&self) -> &str {
        if self.sentence.lang.is_empty() {
            &self.speak.lang
        } else {
            &self.sentence.lang
        }
    }

    /// Opening `<speak>` tag for a new utterance.
    pub fn speak_open(&self) -> String {
        match self.language() {
            "" => "<speak>".to_string(),
            lang => format!("<speak xml:lang=\"{}\">", escape_attr(lang)),
        }
    }

    /// Wrap already-escaped text in the voice, prosody and emphasis tags in
    /// effect.  Tags without attributes are omitted.
    pub fn wrap(&self, escaped: &str) -> String {
        let layers = [
            ("voice", self.voice.open_tag()),
            ("prosody", self.prosody.open_tag()),
            (
                "emphasis",
                open_tag("emphasis", &[("level", self.emphasis.level.as_str())]),
            ),
        ];

        let mut out = String::with_capacity(escaped.len() + 32);
        for open in layers.iter().filter_map(|(_, open)| open.as_deref()) {
            out.push_str(open);
        }
        out.push_str(escaped);
        for (tag, _) in layers.iter().rev().filter(|(_, open)| open.is_some()) {
            let _ = write!(out, "</{tag}>");
        }
        out
    }
}
