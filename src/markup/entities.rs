//! HTML character reference decoding.

use std::borrow::Cow;

use memchr::memchr;
use quick_xml::escape::{resolve_html5_entity, unescape_with};

/// Replace character references in `text`, resolving the full HTML5 named
/// set plus decimal and hexadecimal numeric references. Unknown or malformed
/// references stay verbatim.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    match unescape_with(text, resolve_html5_entity) {
        Ok(decoded) => decoded,
        Err(_) => decode_each(text),
    }
}

/// Decode reference by reference, keeping the ones that do not resolve.
fn decode_each(text: &str) -> Cow<'_, str> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = memchr(b'&', rest.as_bytes()) {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let reference = rest[1..]
            .find(|c: char| c == ';' || c == '&' || c == '<' || c.is_whitespace())
            .filter(|&end| rest[1 + end..].starts_with(';'))
            .map(|end| &rest[..end + 2]);
        match reference.and_then(|r| Some((r, unescape_with(r, resolve_html5_entity).ok()?))) {
            Some((reference, decoded)) => {
                out.push_str(&decoded);
                rest = &rest[reference.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
