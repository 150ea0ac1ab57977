//! Splitting an SSML document into one `<speak>` utterance per sentence.
//!
//! ```text
//! <speak xml:lang="en"><voice name="kal">One. Two</voice> three.</speak>
//!
//!   ─▶ <speak xml:lang="en"><voice name="kal">One.</voice></speak>
//!      \t
//!      <speak xml:lang="en"><voice name="kal">Two</voice> three.</speak>
//! ```
//!
//! Text nodes are split with the boundary rule.  Every sentence carries its
//! own copy of the voice, prosody and emphasis in effect, so utterances can
//! be spoken independently.  `<s>`/`<p>` always end a sentence; `<break>`
//! is copied into the sentence it precedes, or the last one when nothing
//! follows it.

use std::rc::Rc;

use roxmltree::{Document, Node, ParsingOptions};

use super::context::{ElementKind, SsmlContext};
use super::escape::{escape_attr, escape_text};
use super::prose::split_sentences;
use super::BoundaryRule;
use crate::filter::CancelToken;

/// Spoken instead of a document that does not parse.
pub const INVALID_MARKUP_TEXT: &str = "Invalid S S M L.";

const SPEAK_CLOSE: &str = "</speak>";

/// Split a whitespace-normalised SSML document.
///
/// Returns `None` when `cancel` is raised during the walk.
pub fn segment_ssml(text: &str, rule: &BoundaryRule, cancel: &CancelToken) -> Option<String> {
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    let doc = match Document::parse_with_options(text, options) {
        Ok(doc) => doc,
        Err(e) => {
            log::debug!("sbd: markup does not parse: {e}");
            return Some(INVALID_MARKUP_TEXT.to_string());
        }
    };

    let mut writer = SentenceWriter::new(rule);
    writer.walk(doc.root_element(), cancel)?;
    writer.close_sentence();
    Some(writer.finish())
}

// ---------------------------------------------------------------------------
// SentenceWriter
// ---------------------------------------------------------------------------

/// Pending work of the document walk.
enum Step<'a, 'input> {
    Visit(Node<'a, 'input>, Rc<SsmlContext>),
    /// Leaving an `s`/`p` element.
    EndSentence,
}

struct SentenceWriter<'r> {
    rule: &'r BoundaryRule,
    sentences: Vec<String>,
    /// Sentence being built, opening `<speak>` included.
    open: Option<String>,
    /// Breaks seen between two sentences, emitted with the next one.
    pending_breaks: String,
}

impl<'r> SentenceWriter<'r> {
    fn new(rule: &'r BoundaryRule) -> Self {
        Self {
            rule,
            sentences: Vec::new(),
            open: None,
            pending_breaks: String::new(),
        }
    }

    /// Depth-first walk from `root` on an explicit stack, so nesting depth
    /// is bounded by memory rather than by the thread's stack.
    fn walk(&mut self, root: Node<'_, '_>, cancel: &CancelToken) -> Option<()> {
        let mut stack = vec![Step::Visit(root, Rc::new(SsmlContext::default()))];

        while let Some(step) = stack.pop() {
            if cancel.is_cancelled() {
                return None;
            }
            let (node, ctx) = match step {
                Step::EndSentence => {
                    self.close_sentence();
                    continue;
                }
                Step::Visit(node, ctx) => (node, ctx),
            };
            if node.is_text() {
                self.text(node.text().unwrap_or_default(), &ctx);
                continue;
            }
            if !node.is_element() {
                continue;
            }

            let kind = ElementKind::of(node.tag_name().name());
            let inner = match kind {
                ElementKind::Break => {
                    self.push_break(empty_element(node), &ctx);
                    continue;
                }
                ElementKind::Other => ctx,
                _ => Rc::new(ctx.entered(kind, node)),
            };
            if kind == ElementKind::Sentence {
                stack.push(Step::EndSentence);
            }
            for child in node.children().rev() {
                stack.push(Step::Visit(child, Rc::clone(&inner)));
            }
        }
        Some(())
    }

    /// Split a text node: every boundary closes the current sentence; the
    /// tail is left open for whatever follows.
    fn text(&mut self, text: &str, ctx: &SsmlContext) {
        let split = split_sentences(text, self.rule);
        let mut pieces = split.split('\t');
        let Some(mut current) = pieces.next() else {
            return;
        };
        for next in pieces {
            self.append(current, ctx);
            self.close_sentence();
            current = next;
        }
        self.append(current, ctx);
    }

    fn append(&mut self, fragment: &str, ctx: &SsmlContext) {
        if fragment.trim().is_empty() {
            // Whitespace never starts an utterance.
            if let Some(open) = self.open.as_mut() {
                open.push_str(fragment);
            }
            return;
        }
        let fragment = if self.open.is_none() {
            fragment.trim_start()
        } else {
            fragment
        };
        let wrapped = ctx.wrap(&escape_text(fragment));
        self.sentence(ctx).push_str(&wrapped);
    }

    /// A break between sentences waits for the next one; at the very end
    /// it joins the last sentence instead.
    fn push_break(&mut self, tag: String, ctx: &SsmlContext) {
        match self.open.as_mut() {
            Some(open) => open.push_str(&tag),
            None if !self.sentences.is_empty() => self.pending_breaks.push_str(&tag),
            None => self.sentence(ctx).push_str(&tag),
        }
    }

    /// The open sentence, starting one if needed.
    fn sentence(&mut self, ctx: &SsmlContext) -> &mut String {
        let pending = &mut self.pending_breaks;
        self.open.get_or_insert_with(|| {
            let mut open = ctx.speak_open();
            open.push_str(&std::mem::take(pending));
            open
        })
    }

    fn close_sentence(&mut self) {
        if let Some(mut sentence) = self.open.take() {
            sentence.push_str(SPEAK_CLOSE);
            self.sentences.push(sentence);
        }
    }

    fn finish(mut self) -> String {
        if !self.pending_breaks.is_empty() {
            if let Some(last) = self.sentences.last_mut() {
                let at = last.len() - SPEAK_CLOSE.len();
                last.insert_str(at, &self.pending_breaks);
            }
        }
        self.sentences.join("\t")
    }
}

/// Re-serialise an element as an empty tag with its attributes.
fn empty_element(node: Node<'_, '_>) -> String {
    let mut tag = format!("<{}", node.tag_name().name());
    for attr in node.attributes() {
        tag.push(' ');
        tag.push_str(attr.name());
        tag.push_str("=\"");
        tag.push_str(&escape_attr(attr.value()));
        tag.push('"');
    }
    tag.push_str("/>");
    tag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sbd::prose::normalize_whitespace;

    fn segment(text: &str) -> String {
        segment_ssml(&normalize_whitespace(text), &BoundaryRule::default(), &CancelToken::default())
            .unwrap()
    }

    #[test]
    fn each_s_becomes_a_speak() {
        assert_eq!(
            segment("<speak><s>Hi.</s><s>Bye.</s></speak>"),
            "<speak>Hi.</speak>\t<speak>Bye.</speak>"
        );
    }

    #[test]
    fn boundaries_inside_text_nodes_split() {
        assert_eq!(
            segment(r#"<speak xml:lang="en">One. Two! Three</speak>"#),
            concat!(
                r#"<speak xml:lang="en">One.</speak>"#,
                "\t",
                r#"<speak xml:lang="en">Two!</speak>"#,
                "\t",
                r#"<speak xml:lang="en">Three</speak>"#
            )
        );
    }

    #[test]
    fn voice_attributes_do_not_leak_between_sentences() {
        let out = segment(
            r#"<speak><s><voice name="kal">One.</voice></s><s><voice gender="female">Two.</voice></s></speak>"#,
        );
        assert_eq!(
            out,
            concat!(
                r#"<speak><voice name="kal">One.</voice></speak>"#,
                "\t",
                r#"<speak><voice gender="female">Two.</voice></speak>"#
            )
        );
    }

    #[test]
    fn sentence_spanning_elements_keeps_each_context() {
        let out = segment(r#"<speak><voice name="kal">One. Two</voice> three.</speak>"#);
        assert_eq!(
            out,
            concat!(
                r#"<speak><voice name="kal">One.</voice></speak>"#,
                "\t",
                r#"<speak><voice name="kal">Two</voice> three.</speak>"#
            )
        );
    }

    #[test]
    fn voice_carries_over_into_the_next_sentence() {
        let out = segment(r#"<speak><voice gender="male">A. B.</voice></speak>"#);
        assert_eq!(
            out,
            concat!(
                r#"<speak><voice gender="male">A.</voice></speak>"#,
                "\t",
                r#"<speak><voice gender="male">B.</voice></speak>"#
            )
        );
    }

    #[test]
    fn innermost_sentence_language_wins() {
        let out = segment(r#"<speak xml:lang="en"><p xml:lang="de">Hallo.</p><s>Hi.</s></speak>"#);
        assert_eq!(
            out,
            concat!(
                r#"<speak xml:lang="de">Hallo.</speak>"#,
                "\t",
                r#"<speak xml:lang="en">Hi.</speak>"#
            )
        );
    }

    #[test]
    fn break_is_copied_into_the_sentence() {
        assert_eq!(
            segment(r#"<speak>Wait <break time="1s"/> now.</speak>"#),
            r#"<speak>Wait <break time="1s"/> now.</speak>"#
        );
    }

    #[test]
    fn prosody_and_emphasis_nest() {
        assert_eq!(
            segment(r#"<speak><prosody rate="slow"><emphasis>Really.</emphasis></prosody></speak>"#),
            r#"<speak><prosody rate="slow"><emphasis level="moderate">Really.</emphasis></prosody></speak>"#
        );
    }

    #[test]
    fn text_is_re_escaped() {
        assert_eq!(
            segment("<speak>Fish &amp; chips &lt; steak.</speak>"),
            "<speak>Fish &amp; chips &lt; steak.</speak>"
        );
    }

    #[test]
    fn unknown_elements_are_walked_through() {
        assert_eq!(
            segment("<speak><sub alias=\"x\">Hi.</sub></speak>"),
            "<speak>Hi.</speak>"
        );
    }

    #[test]
    fn whitespace_between_elements_starts_nothing() {
        assert_eq!(
            segment("<speak>\n  <s>Hi.</s>\n  <s>Bye.</s>\n</speak>"),
            "<speak>Hi.</speak>\t<speak>Bye.</speak>"
        );
    }

    #[test]
    fn break_between_sentences_joins_the_next_one() {
        assert_eq!(
            segment(r#"<speak><s>Hi.</s><break time="1s"/><s>Bye.</s></speak>"#),
            concat!(
                "<speak>Hi.</speak>",
                "\t",
                r#"<speak><break time="1s"/>Bye.</speak>"#
            )
        );
    }

    #[test]
    fn trailing_break_stays_with_the_last_sentence() {
        assert_eq!(segment("<speak>Hi. <break/></speak>"), "<speak>Hi.<break/></speak>");
    }

    #[test]
    fn lone_break_is_still_spoken() {
        assert_eq!(segment("<speak><break/></speak>"), "<speak><break/></speak>");
    }

    #[test]
    fn cdata_is_split_and_escaped_like_text() {
        assert_eq!(
            segment("<speak><![CDATA[A < B. C & D]]></speak>"),
            "<speak>A &lt; B.</speak>\t<speak>C &amp; D</speak>"
        );
    }

    #[test]
    fn deeply_nested_markup_does_not_exhaust_the_stack() {
        let depth = 5_000;
        let text = format!(
            "<speak>{}Hi. Bye.{}</speak>",
            "<emphasis>".repeat(depth),
            "</emphasis>".repeat(depth)
        );
        let emphasised = |s: &str| format!(r#"<speak><emphasis level="moderate">{s}</emphasis></speak>"#);
        assert_eq!(segment(&text), format!("{}\t{}", emphasised("Hi."), emphasised("Bye.")));
    }

    #[test]
    fn malformed_markup_is_reported_aloud() {
        assert_eq!(segment("<speak><s>Hi.</speak>"), INVALID_MARKUP_TEXT);
    }

    #[test]
    fn doctype_is_accepted() {
        assert_eq!(
            segment("<?xml version=\"1.0\"?><!DOCTYPE speak><speak>Hi.</speak>"),
            "<speak>Hi.</speak>"
        );
    }

    #[test]
    fn cancelled_walk_returns_none() {
        let cancel = CancelToken::default();
        cancel.cancel();
        assert!(segment_ssml("<speak>Hi.</speak>", &BoundaryRule::default(), &cancel).is_none());
    }
}
