//! EPUB 3 navigation document parsing.

use crate::markup::{Tag, Token, tokenize};
use crate::util::collapse_whitespace;

use super::TocEntry;

/// Parse the table-of-contents list of a navigation document.
///
/// The `nav` marked `epub:type="toc"` (or `role="doc-toc"`) is preferred,
/// falling back to the first `nav`, then to the first list in the document.
/// Entries come out in pre-order; `depth` is the list nesting level with
/// root items at 0. List items whose link text is empty are skipped.
pub fn parse_nav(content: &str) -> Vec<TocEntry> {
    let tokens = tokenize(content);
    let start = toc_nav_start(&tokens).unwrap_or(0);
    walk_toc_list(&tokens[start..])
}

fn is_toc_nav(tag: &Tag) -> bool {
    tag.attr_has_word("epub:type", "toc") || tag.attr_has_word("role", "doc-toc")
}

fn toc_nav_start(tokens: &[Token]) -> Option<usize> {
    let mut first_nav = None;
    for (i, token) in tokens.iter().enumerate() {
        if let Token::Open(tag) = token
            && tag.is("nav")
        {
            if is_toc_nav(tag) {
                return Some(i);
            }
            first_nav.get_or_insert(i);
        }
    }
    first_nav
}

/// Link currently being collected inside a list item.
struct PendingLink {
    href: String,
    text: String,
    depth: usize,
}

fn walk_toc_list(tokens: &[Token]) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    let mut list_depth = 0usize;
    let mut link: Option<PendingLink> = None;

    for token in tokens {
        match token {
            Token::Open(tag) if tag.is("ol") || tag.is("ul") => list_depth += 1,
            Token::Close(_) if token.is_close("ol") || token.is_close("ul") => {
                if list_depth == 0 {
                    continue;
                }
                list_depth -= 1;
                if list_depth == 0 {
                    break;
                }
            }
            Token::Open(tag) if tag.is("a") && list_depth > 0 => {
                link = Some(PendingLink {
                    href: tag.attr("href").unwrap_or_default().trim().to_string(),
                    text: String::new(),
                    depth: list_depth - 1,
                });
            }
            Token::Close(_) if token.is_close("a") => {
                let Some(done) = link.take() else { continue };
                let title = collapse_whitespace(&done.text);
                if title.is_empty() || done.href.is_empty() {
                    tracing::trace!(
                        href = %done.href,
                        "Skipping navigation item without link text"
                    );
                    continue;
                }
                entries.push(TocEntry {
                    title,
                    href: done.href,
                    depth: done.depth,
                });
            }
            Token::Text(text) => {
                if let Some(link) = link.as_mut() {
                    link.text.push_str(text);
                }
            }
            Token::Close(_) if token.is_close("nav") && list_depth == 0 => {
                if !entries.is_empty() {
                    break;
                }
            }
            _ => {}
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(entries: &[TocEntry]) -> Vec<(&str, &str, usize)> {
        entries
            .iter()
            .map(|e| (e.title.as_str(), e.href.as_str(), e.depth))
            .collect()
    }

    #[test]
    fn test_parse_nested_nav() {
        let nav = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<body>
  <nav epub:type="toc" id="toc">
    <h1>Contents</h1>
    <ol>
      <li><a href="part1.xhtml">Part I</a>
        <ol>
          <li><a href="ch1.xhtml">Chapter <em>One</em></a></li>
          <li><a href="ch2.xhtml#s2">Chapter Two</a>
            <ol><li><a href="ch2.xhtml#s2-1">Section</a></li></ol>
          </li>
        </ol>
      </li>
      <li><a href="part2.xhtml">Part II</a></li>
    </ol>
  </nav>
</body>
</html>"#;

        let entries = parse_nav(nav);
        assert_eq!(
            summary(&entries),
            vec![
                ("Part I", "part1.xhtml", 0),
                ("Chapter One", "ch1.xhtml", 1),
                ("Chapter Two", "ch2.xhtml#s2", 1),
                ("Section", "ch2.xhtml#s2-1", 2),
                ("Part II", "part2.xhtml", 0),
            ]
        );
    }

    #[test]
    fn test_prefers_toc_nav_over_landmarks() {
        let nav = r#"<html><body>
<nav epub:type="landmarks"><ol><li><a href="cover.xhtml">Cover</a></li></ol></nav>
<nav epub:type="toc"><ol><li><a href="c1.xhtml">One</a></li></ol></nav>
</body></html>"#;
        assert_eq!(summary(&parse_nav(nav)), vec![("One", "c1.xhtml", 0)]);
    }

    #[test]
    fn test_role_doc_toc() {
        let nav = r#"<nav role="doc-toc"><ul><li><a href="a.xhtml">A</a></li></ul></nav>"#;
        assert_eq!(summary(&parse_nav(nav)), vec![("A", "a.xhtml", 0)]);
    }

    #[test]
    fn test_skips_empty_link_text_and_spans() {
        let nav = r#"<nav epub:type="toc"><ol>
<li><a href="blank.xhtml">  </a></li>
<li><span>Heading only</span>
  <ol><li><a href="c1.xhtml">One</a></li></ol>
</li>
<li><a href="c2.xhtml">Two &amp; Three</a></li>
</ol></nav>"#;
        assert_eq!(
            summary(&parse_nav(nav)),
            vec![("One", "c1.xhtml", 1), ("Two & Three", "c2.xhtml", 0)]
        );
    }

    #[test]
    fn test_no_list_yields_nothing() {
        assert!(parse_nav("<html><body><p>No toc</p></body></html>").is_empty());
    }
}
