//! Legacy NCX table-of-contents parsing.

use crate::markup::{Token, tokenize};
use crate::util::collapse_whitespace;

use super::TocEntry;

/// State of one open `navPoint`.
struct NavPointFrame {
    /// Reserved output position, so parents precede their children.
    slot: usize,
    depth: usize,
    label: Option<String>,
    src: Option<String>,
}

/// Parse `navPoint` entries in document order.
///
/// Depth is the `navPoint` open/close nesting level. The label is the first
/// `navLabel/text` of the point and the target the first `content/@src`;
/// points missing either are dropped without affecting their children.
pub fn parse_ncx(content: &str) -> Vec<TocEntry> {
    let tokens = tokenize(content);
    let mut slots: Vec<Option<TocEntry>> = Vec::new();
    let mut stack: Vec<NavPointFrame> = Vec::new();
    let mut in_label = false;
    let mut label_text: Option<String> = None;

    for token in &tokens {
        match token {
            Token::Open(tag) if tag.is("navPoint") => {
                stack.push(NavPointFrame {
                    slot: slots.len(),
                    depth: stack.len(),
                    label: None,
                    src: None,
                });
                slots.push(None);
            }
            Token::Close(_) if token.is_close("navPoint") => {
                let Some(frame) = stack.pop() else { continue };
                match (frame.label, frame.src) {
                    (Some(title), Some(href)) => {
                        slots[frame.slot] = Some(TocEntry {
                            title,
                            href,
                            depth: frame.depth,
                        });
                    }
                    (title, href) => {
                        tracing::trace!(?title, ?href, "Dropping incomplete navPoint");
                    }
                }
            }
            Token::Open(tag) if tag.is("navLabel") => in_label = true,
            Token::Close(_) if token.is_close("navLabel") => in_label = false,
            Token::Open(tag) if tag.is("text") && in_label => {
                label_text = Some(String::new());
            }
            Token::Text(text) => {
                if let Some(label) = label_text.as_mut() {
                    label.push_str(text);
                }
            }
            Token::Close(_) if token.is_close("text") => {
                let Some(raw) = label_text.take() else { continue };
                let label = collapse_whitespace(&raw);
                if let Some(frame) = stack.last_mut()
                    && frame.label.is_none()
                    && !label.is_empty()
                {
                    frame.label = Some(label);
                }
            }
            Token::Open(tag) | Token::SelfClose(tag) if tag.is("content") => {
                if let Some(frame) = stack.last_mut()
                    && frame.src.is_none()
                    && let Some(src) = tag.attr("src").map(str::trim).filter(|s| !s.is_empty())
                {
                    frame.src = Some(src.to_string());
                }
            }
            _ => {}
        }
    }

    slots.into_iter().flatten().collect()
}
