//! Markup tokenization and entity decoding.
//!
//! Container, package, navigation and NCX documents are read through the
//! tolerant [`Tokenizer`]; consumers keep their own element stacks over the
//! flat token stream. Chapter bodies go through the HTML parser in
//! [`crate::dom`] instead.

mod entities;
mod tokenizer;

pub use entities::decode_entities;
pub use tokenizer::{Tag, Token, Tokenizer, local_name, tokenize};

use crate::util::collapse_whitespace;

/// Text content of the first element with the given local name, whitespace
/// collapsed. Returns `None` when absent or empty.
pub fn first_element_text(tokens: &[Token], name: &str) -> Option<String> {
    let start = tokens.iter().position(|t| t.is_open(name))?;
    let text = element_text(&tokens[start + 1..], name);
    let text = collapse_whitespace(&text);
    (!text.is_empty()).then_some(text)
}

/// Concatenated text of `tokens` up to the close tag balancing an already
/// consumed open tag named `name`.
pub fn element_text(tokens: &[Token], name: &str) -> String {
    let mut depth = 0usize;
    let mut text = String::new();
    for token in tokens {
        match token {
            Token::Open(tag) if tag.is(name) => depth += 1,
            Token::Close(_) if token.is_close(name) => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Token::Text(t) => text.push_str(t),
            _ => {}
        }
    }
    text
}
