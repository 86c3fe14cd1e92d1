//! META-INF/container.xml parsing.

use crate::error::{Error, Result};
use crate::markup::{Token, Tokenizer};

/// Archive path of the container pointer file.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

const PACKAGE_MEDIA_TYPE: &str = "application/oebps-package+xml";

/// Find the package document path named by the container pointer.
///
/// The first `rootfile` declaring the OPF media type wins; otherwise the
/// first `rootfile` with a `full-path`.
pub fn parse_container(content: &str) -> Result<String> {
    let mut fallback = None;

    for token in Tokenizer::new(content) {
        let (Token::Open(tag) | Token::SelfClose(tag)) = &token else {
            continue;
        };
        if !tag.is("rootfile") {
            continue;
        }
        let Some(path) = tag.attr("full-path").map(str::trim).filter(|p| !p.is_empty()) else {
            continue;
        };
        if tag
            .attr("media-type")
            .is_some_and(|m| m.eq_ignore_ascii_case(PACKAGE_MEDIA_TYPE))
        {
            return Ok(path.to_string());
        }
        fallback.get_or_insert_with(|| path.to_string());
    }

    fallback.ok_or(Error::MissingPackageReference)
}
