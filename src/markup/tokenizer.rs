//! Tolerant markup tokenizer over [`quick_xml::Reader`].
//!
//! Produces a flat stream of [`Token`]s from package, navigation and NCX
//! documents. End-name checks are off, so mismatched or stray close tags pass
//! through as tokens. Comments, doctypes and processing instructions are
//! skipped, CDATA sections become text, and adjacent text (including decoded
//! references) is merged into one token. A syntax error ends the stream.

use std::collections::VecDeque;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::entities::decode_entities;

/// One markup event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Open(Tag),
    Close(String),
    SelfClose(Tag),
    /// Text with character references decoded.
    Text(String),
}

/// A start tag (or self-closing tag) with its attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tag {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    /// Name without namespace prefix (`dc:title` -> `title`).
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// Case-insensitive comparison of the local name.
    pub fn is(&self, name: &str) -> bool {
        self.local_name().eq_ignore_ascii_case(name)
    }

    /// Attribute value by exact (case-insensitive) qualified name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True when a whitespace-separated attribute contains `word`.
    pub fn attr_has_word(&self, name: &str, word: &str) -> bool {
        self.attr(name)
            .is_some_and(|v| v.split_ascii_whitespace().any(|w| w.eq_ignore_ascii_case(word)))
    }
}

impl Token {
    /// The tag of an `Open` or `SelfClose` token.
    pub fn tag(&self) -> Option<&Tag> {
        match self {
            Token::Open(tag) | Token::SelfClose(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn is_open(&self, name: &str) -> bool {
        matches!(self, Token::Open(tag) if tag.is(name))
    }

    pub fn is_close(&self, name: &str) -> bool {
        matches!(self, Token::Close(n) if local_name(n).eq_ignore_ascii_case(name))
    }
}

/// Extract the local name from a potentially namespaced name.
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

/// Tokenize a whole document.
pub fn tokenize(src: &str) -> Vec<Token> {
    Tokenizer::new(src).collect()
}

/// Streaming tokenizer over a string slice.
pub struct Tokenizer<'a> {
    reader: Reader<&'a [u8]>,
    /// Text gathered from consecutive text, CDATA and reference events.
    text: String,
    pending: VecDeque<Token>,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        let mut reader = Reader::from_str(src);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.allow_dangling_amp = true;
        config.check_comments = false;
        Self {
            reader,
            text: String::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn read_next(&mut self) {
        match self.reader.read_event() {
            Ok(Event::Text(e)) => self.text.push_str(&String::from_utf8_lossy(&e)),
            Ok(Event::CData(e)) => self.text.push_str(&String::from_utf8_lossy(&e)),
            Ok(Event::GeneralRef(e)) => {
                let reference = format!("&{};", String::from_utf8_lossy(&e));
                self.text.push_str(&decode_entities(&reference));
            }
            Ok(Event::Start(e)) => self.emit(Token::Open(tag_of(&e))),
            Ok(Event::Empty(e)) => self.emit(Token::SelfClose(tag_of(&e))),
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                self.emit(Token::Close(name));
            }
            Ok(Event::Eof) => self.finish(),
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(
                    %err,
                    position = self.reader.buffer_position(),
                    "Stopping at malformed markup"
                );
                self.finish();
            }
        }
    }

    fn emit(&mut self, token: Token) {
        self.flush_text();
        self.pending.push_back(token);
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.pending.push_back(Token::Text(std::mem::take(&mut self.text)));
        }
    }

    fn finish(&mut self) {
        self.flush_text();
        self.done = true;
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        while self.pending.is_empty() && !self.done {
            self.read_next();
        }
        self.pending.pop_front()
    }
}

/// Tag name and attributes, with HTML attribute syntax accepted
/// (unquoted values, bare names).
fn tag_of(start: &BytesStart<'_>) -> Tag {
    let mut tag = Tag::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.html_attributes() {
        match attr {
            Ok(attr) => {
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let value = String::from_utf8_lossy(&attr.value);
                tag.attrs.push((key, decode_entities(&value).into_owned()));
            }
            Err(err) => tracing::trace!(%err, tag = %tag.name, "Skipping malformed attribute"),
        }
    }
    tag
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(name: &str, attrs: &[(&str, &str)]) -> Token {
        Token::Open(Tag {
            name: name.into(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
    }

    #[test]
    fn test_basic_events() {
        let tokens = tokenize(r#"<p class="x">Hi <b>there</b><br/></p>"#);
        assert_eq!(
            tokens,
            vec![
                open("p", &[("class", "x")]),
                Token::Text("Hi ".into()),
                open("b", &[]),
                Token::Text("there".into()),
                Token::Close("b".into()),
                Token::SelfClose(Tag::new("br")),
                Token::Close("p".into()),
            ]
        );
    }

    #[test]
    fn test_attribute_order_and_quoting_variants() {
        let tokens = tokenize(
            r#"<item href='a.xhtml' media-type=application/xhtml+xml id="c1" hidden/>"#,
        );
        let tag = tokens[0].tag().unwrap();
        assert_eq!(tag.attr("id"), Some("c1"));
        assert_eq!(tag.attr("href"), Some("a.xhtml"));
        assert_eq!(tag.attr("media-type"), Some("application/xhtml+xml"));
        assert_eq!(tag.attr("hidden"), Some(""));
        assert!(matches!(tokens[0], Token::SelfClose(_)));
    }

    #[test]
    fn test_namespaced_names() {
        let tokens = tokenize(r#"<dc:title>Book</dc:title><nav epub:type="toc landmarks"/>"#);
        let title = tokens[0].tag().unwrap();
        assert_eq!(title.local_name(), "title");
        assert!(tokens[2].is_close("title"));
        assert!(tokens[3].tag().unwrap().attr_has_word("epub:type", "toc"));
    }

    #[test]
    fn test_entities_in_text_and_attributes() {
        let tokens = tokenize(r#"<a title="Q&amp;A">Don&#39;t &mdash; stop &hearts;</a>"#);
        assert_eq!(tokens[0].tag().unwrap().attr("title"), Some("Q&A"));
        assert_eq!(tokens[1], Token::Text("Don't \u{2014} stop \u{2665}".into()));
        assert!(tokens[2].is_close("a"));
    }

    #[test]
    fn test_unknown_reference_stays_in_text() {
        let tokens = tokenize("<p>AT&T &bogus; ok</p>");
        assert_eq!(tokens[1], Token::Text("AT&T &bogus; ok".into()));
    }

    #[test]
    fn test_skips_comments_doctype_and_declarations() {
        let tokens =
            tokenize("<?xml version=\"1.0\"?><!DOCTYPE html><!-- <p>no</p> --><p>yes</p>");
        assert_eq!(
            tokens,
            vec![open("p", &[]), Token::Text("yes".into()), Token::Close("p".into())]
        );
    }

    #[test]
    fn test_cdata_merges_with_text() {
        let tokens = tokenize("<p>x <![CDATA[a<b]]> y</p>");
        assert_eq!(tokens[1], Token::Text("x a<b y".into()));
    }

    #[test]
    fn test_mismatched_close_passes_through() {
        let tokens = tokenize("<div><p>one</span>two</div>");
        assert!(tokens[3].is_close("span"));
        assert_eq!(tokens[4], Token::Text("two".into()));
        assert!(tokens[5].is_close("div"));
    }

    #[test]
    fn test_unterminated_tag_ends_stream() {
        let tokens = tokenize("<p>text</p><a href=\"x");
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_multibyte_text_survives() {
        let tokens = tokenize("<p>naïve — ünïcödé</p>");
        assert_eq!(tokens[1], Token::Text("naïve — ünïcödé".into()));
    }
}
