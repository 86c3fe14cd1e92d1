//! Capturing selections from rendered chapters and drawing them back.

mod common;

use common::{EpubBuilder, XHTML, chapter_xhtml, package_xml};
use marginalia::annotation::{Annotations, PendingHighlight};
use marginalia::cfi::{
    Boundary, Selection, apply_highlights, capture, highlight_at, marker_text, markers,
};
use marginalia::dom::{Document, NodeId, parse, to_html};
use marginalia::{Book, ReaderConfig};
use proptest::prelude::*;
use proptest::sample::Index;

fn lighthouse_book() -> Vec<u8> {
    let items = [("c1", "c1.xhtml", XHTML, None)];
    EpubBuilder::new()
        .container("content.opf")
        .file("content.opf", &package_xml("Keeper", &items, &["c1"], None))
        .file(
            "c1.xhtml",
            &chapter_xhtml(
                Some("Watch"),
                "<p>The <b>light</b><i>house</i> keeper slept.</p><p>Morning came.</p>",
            ),
        )
        .build()
}

fn text_in(doc: &Document, tag: &str) -> NodeId {
    doc.find_by_tag(tag).and_then(|e| doc.first_child(e)).unwrap()
}

#[test]
fn test_cross_element_highlight_survives_rerender() {
    let book = Book::open(&lighthouse_book()).unwrap();
    let chapter_id = book.chapters()[0].id.clone();
    let content = book.chapter_content(&chapter_id).unwrap();
    let context_chars = ReaderConfig::default().annotations.context_chars;

    let rendered = parse(content);
    let selection = Selection::new(
        Boundary::new(text_in(&rendered, "b"), 0),
        Boundary::new(text_in(&rendered, "i"), 5),
    );
    let captured = capture(&rendered, &selection, context_chars).unwrap();
    assert_eq!(captured.text, "lighthouse");
    assert!(captured.context.contains("The lighthouse keeper slept."));

    let mut annotations = Annotations::new();
    let id = annotations.commit(PendingHighlight::from_capture(chapter_id.as_str(), captured));

    // A fresh render of the same chapter, as after navigating away and back.
    let mut fresh = parse(content);
    let report = apply_highlights(&mut fresh, annotations.ranges_for_chapter(&chapter_id));
    assert_eq!(report.applied, vec![id.clone()]);

    let found = markers(&fresh);
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|(marker_id, _)| *marker_id == id));
    assert_eq!(marker_text(&fresh, &id), "lighthouse");

    let html = to_html(&fresh);
    assert!(html.contains("<b><mark"));
    assert!(html.contains(">light</mark></b>"));
    assert!(html.contains(">house</mark></i> keeper slept."));

    let house = markers(&fresh)[1].1;
    let inner = fresh.first_child(house).unwrap();
    assert_eq!(highlight_at(&fresh, inner), Some(id.as_str()));
}

#[test]
fn test_reapplying_batch_is_idempotent() {
    let book = Book::open(&lighthouse_book()).unwrap();
    let content = book.chapter_content("chapter-0").unwrap();

    let doc = parse(content);
    let keeper = text_in(&doc, "i");
    let after = doc.next_sibling(doc.parent(keeper).unwrap()).unwrap();
    let captured = capture(&doc, &Selection::within(after, 1, 7), 20).unwrap();
    assert_eq!(captured.text, "keeper");

    let mut annotations = Annotations::new();
    annotations.commit(PendingHighlight::from_capture("chapter-0", captured));

    let mut rendered = parse(content);
    apply_highlights(&mut rendered, annotations.ranges_for_chapter("chapter-0"));
    let once = to_html(&rendered);

    let report = apply_highlights(&mut rendered, annotations.ranges_for_chapter("chapter-0"));
    assert!(report.applied.is_empty());
    assert_eq!(report.retained.len(), 1);
    assert_eq!(to_html(&rendered), once);
}

#[test]
fn test_removed_highlight_restores_markup() {
    let source = "<p>The quick brown fox</p>";
    let mut doc = parse(source);
    let t = text_in(&doc, "p");
    let captured = capture(&doc, &Selection::within(t, 4, 9), 0).unwrap();

    let mut annotations = Annotations::new();
    let id = annotations.commit(PendingHighlight::from_capture("chapter-0", captured));
    apply_highlights(&mut doc, annotations.ranges_for_chapter("chapter-0"));
    assert_ne!(to_html(&doc), to_html(&parse(source)));

    annotations.remove(&id);
    let report = apply_highlights(&mut doc, annotations.ranges_for_chapter("chapter-0"));
    assert_eq!(report.removed, vec![id]);
    assert_eq!(to_html(&doc), to_html(&parse(source)));
    let p = doc.find_by_tag("p").unwrap();
    assert_eq!(doc.children(p).count(), 1);
}

/// One paragraph of words, some wrapped in inline elements, separated by
/// spaces that become whitespace-only text between the inline elements.
fn paragraph() -> impl Strategy<Value = String> {
    prop::collection::vec(("[a-z]{1,6}", 0u8..3), 1..5).prop_map(|words| {
        let inline: Vec<String> = words
            .into_iter()
            .map(|(word, kind)| match kind {
                0 => word,
                1 => format!("<b>{word}</b>"),
                _ => format!("<i>{word}</i>"),
            })
            .collect();
        format!("<p>{}</p>", inline.join(" "))
    })
}

fn chapter_body() -> impl Strategy<Value = String> {
    (prop::collection::vec(paragraph(), 1..5), prop::bool::ANY).prop_map(|(blocks, indent)| {
        let separator = if indent { "\n  " } else { "\n" };
        format!("<div>{}</div>", blocks.join(separator))
    })
}

fn point(doc: &Document, nodes: &[NodeId], node: &Index, offset: &Index) -> Boundary {
    let node = nodes[node.index(nodes.len())];
    let len = doc.text(node).map(|t| t.chars().count()).unwrap_or(0);
    Boundary::new(node, offset.index(len + 1))
}

proptest! {
    #[test]
    fn prop_marked_text_equals_captured_text(
        source in chapter_body(),
        anchor in (any::<Index>(), any::<Index>()),
        focus in (any::<Index>(), any::<Index>()),
    ) {
        let doc = parse(&source);
        let nodes: Vec<NodeId> = doc.text_nodes(doc.body().unwrap()).collect();
        let selection = Selection::new(
            point(&doc, &nodes, &anchor.0, &anchor.1),
            point(&doc, &nodes, &focus.0, &focus.1),
        );

        if let Ok(captured) = capture(&doc, &selection, 0) {
            let mut fresh = parse(&source);
            let report = apply_highlights(&mut fresh, [("h", &captured.range)]);
            prop_assert_eq!(report.applied, vec!["h".to_string()]);
            prop_assert_eq!(marker_text(&fresh, "h"), captured.text);
            prop_assert_eq!(fresh.text_content(fresh.root()), doc.text_content(doc.root()));
        }
    }
}
