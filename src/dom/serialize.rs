//! Markup serialization of a [`Document`].

use quick_xml::escape::{escape, partial_escape};

use super::arena::{Document, NodeData, NodeId};
use crate::markup::local_name;

/// Elements that never have content.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub fn is_void(name: &str) -> bool {
    let local = local_name(name);
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(local))
}

/// Serialize the whole document.
pub fn to_html(doc: &Document) -> String {
    inner_html(doc, doc.root())
}

/// Serialize the children of `id`.
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    for child in doc.children(id) {
        write_node(doc, child, &mut out);
    }
    out
}

/// Serialize `id` itself, including its tags.
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

fn is_raw_text(name: &str) -> bool {
    name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style")
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    let Some(node) = doc.get(id) else { return };
    match &node.data {
        NodeData::Document => {
            for child in doc.children(id) {
                write_node(doc, child, out);
            }
        }
        NodeData::Text(text) => {
            let raw_parent = doc
                .parent(id)
                .and_then(|p| doc.element_name(p))
                .is_some_and(is_raw_text);
            if raw_parent {
                out.push_str(text);
            } else {
                out.push_str(&partial_escape(text.as_str()));
            }
        }
        NodeData::Element { name, attrs } => {
            out.push('<');
            out.push_str(name);
            for (key, value) in attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape(value.as_str()));
                out.push('"');
            }
            if doc.first_child(id).is_none() && is_void(name) {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in doc.children(id) {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse;

    fn body_html(src: &str) -> String {
        let doc = parse(src);
        inner_html(&doc, doc.body().unwrap())
    }

    #[test]
    fn test_serialize_roundtrip_shape() {
        let src = r#"<p class="a">One &amp; <b>two</b><br/>&lt;three&gt;</p>"#;
        assert_eq!(body_html(src), src);
    }

    #[test]
    fn test_whole_document_includes_implied_elements() {
        let doc = parse("<p>x</p>");
        assert_eq!(to_html(&doc), "<html><head></head><body><p>x</p></body></html>");
    }

    #[test]
    fn test_attribute_quotes_escaped() {
        let html = body_html(r#"<a title='say "hi"'>x</a>"#);
        assert_eq!(html, r#"<a title="say &quot;hi&quot;">x</a>"#);
    }

    #[test]
    fn test_empty_non_void_keeps_close_tag() {
        let html = body_html("<div></div><script>if (a < b) {}</script>");
        assert_eq!(html, "<div></div><script>if (a < b) {}</script>");
    }

    #[test]
    fn test_inner_and_outer() {
        let doc = parse("<div><span>x</span></div>");
        let div = doc.find_by_tag("div").unwrap();
        assert_eq!(inner_html(&doc, div), "<span>x</span>");
        assert_eq!(outer_html(&doc, div), "<div><span>x</span></div>");
    }
}
