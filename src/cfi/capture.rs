//! Turning a live selection into a persistable range.

use crate::dom::{Document, NodeId};

use super::CaptureError;
use super::path::{is_addressable_text, locate};
use super::range::{CfiRange, ResolvedRange};

/// One end of a selection, with DOM semantics: inside a text node `offset`
/// counts characters, inside an element it is a child index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A selection as reported by the renderer. The anchor may come after the
/// focus (a backward selection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Boundary,
    pub focus: Boundary,
}

impl Selection {
    pub fn new(anchor: Boundary, focus: Boundary) -> Self {
        Self { anchor, focus }
    }

    /// Selection of `[start, end)` characters within a single text node.
    pub fn within(node: NodeId, start: usize, end: usize) -> Self {
        Self::new(Boundary::new(node, start), Boundary::new(node, end))
    }
}

/// A captured selection, ready to become a pending highlight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedSelection {
    pub range: CfiRange,
    /// The selected text exactly as it appears in the document.
    pub text: String,
    /// Document text around the selection, the selection included.
    pub context: String,
}

#[derive(Clone, Copy)]
enum Edge {
    Start,
    End,
}

fn char_len(doc: &Document, node: NodeId) -> usize {
    doc.text(node).map(|t| t.chars().count()).unwrap_or(0)
}

/// Rendered text nodes in document order, for ordering points.
fn text_order(doc: &Document) -> Vec<NodeId> {
    doc.text_nodes(doc.body().unwrap_or(doc.root())).collect()
}

/// Resolve a boundary to a point inside an addressable text node.
///
/// Element boundaries descend to the first text at or after the child index
/// (start) or the last text before it (end). Points in whitespace-only text
/// move forward (start) or backward (end) to the nearest addressable text.
fn to_text_point(
    doc: &Document,
    order: &[NodeId],
    boundary: Boundary,
    edge: Edge,
) -> Option<(NodeId, usize)> {
    let (node, offset) = if doc.is_text(boundary.node) {
        (boundary.node, boundary.offset.min(char_len(doc, boundary.node)))
    } else {
        element_point(doc, order, boundary, edge)?
    };

    if is_addressable_text(doc, node) {
        return Some((node, offset));
    }

    let index = order.iter().position(|&n| n == node)?;
    match edge {
        Edge::Start => order[index + 1..]
            .iter()
            .find(|&&n| is_addressable_text(doc, n))
            .map(|&n| (n, 0)),
        Edge::End => order[..index]
            .iter()
            .rev()
            .find(|&&n| is_addressable_text(doc, n))
            .map(|&n| (n, char_len(doc, n))),
    }
}

fn element_point(
    doc: &Document,
    order: &[NodeId],
    boundary: Boundary,
    edge: Edge,
) -> Option<(NodeId, usize)> {
    let children: Vec<NodeId> = doc.children(boundary.node).collect();
    let split = boundary.offset.min(children.len());
    let nonempty = |t: &str| !t.is_empty();

    match edge {
        Edge::Start => {
            if let Some(found) = children[split..]
                .iter()
                .find_map(|&c| if doc.is_text(c) { Some(c) } else { doc.first_text(c, nonempty) })
            {
                return Some((found, 0));
            }
            // Nothing inside: the first text after this element.
            let last_inside = doc.descendants(boundary.node).last().unwrap_or(boundary.node);
            let index = order
                .iter()
                .position(|&n| !doc.contains(boundary.node, n) && follows(doc, last_inside, n))?;
            Some((order[index], 0))
        }
        Edge::End => {
            if let Some(found) = children[..split]
                .iter()
                .rev()
                .find_map(|&c| if doc.is_text(c) { Some(c) } else { doc.last_text(c, nonempty) })
            {
                return Some((found, char_len(doc, found)));
            }
            // Nothing inside: the last text before this element.
            let found = order
                .iter()
                .rev()
                .find(|&&n| !doc.contains(boundary.node, n) && follows(doc, n, boundary.node))?;
            Some((*found, char_len(doc, *found)))
        }
    }
}

/// Whether `later` comes after `earlier` in document order.
fn follows(doc: &Document, earlier: NodeId, later: NodeId) -> bool {
    for node in doc.descendants(doc.root()) {
        if node == earlier {
            return node != later;
        }
        if node == later {
            return false;
        }
    }
    false
}

fn order_key(order: &[NodeId], point: (NodeId, usize)) -> Option<(usize, usize)> {
    Some((order.iter().position(|&n| n == point.0)?, point.1))
}

/// Capture a selection as a range plus text snapshots.
///
/// `context_chars` characters of document text are kept on each side of the
/// selection. Rejects collapsed selections and selections with no visible
/// text.
pub fn capture(
    doc: &Document,
    selection: &Selection,
    context_chars: usize,
) -> Result<CapturedSelection, CaptureError> {
    let order = text_order(doc);

    // Order the raw boundaries first so each end descends on the right side.
    let key = |boundary| {
        to_text_point(doc, &order, boundary, Edge::Start).and_then(|p| order_key(&order, p))
    };
    let (anchor_key, focus_key) = (key(selection.anchor), key(selection.focus));
    let (first, last) = match (anchor_key, focus_key) {
        (Some(a), Some(f)) if f < a => (selection.focus, selection.anchor),
        _ => (selection.anchor, selection.focus),
    };

    if first == last {
        return Err(CaptureError::Collapsed);
    }

    let start =
        to_text_point(doc, &order, first, Edge::Start).ok_or(CaptureError::Unaddressable)?;
    let end = to_text_point(doc, &order, last, Edge::End).ok_or(CaptureError::Unaddressable)?;

    let (start_key, end_key) = (
        order_key(&order, start).ok_or(CaptureError::Unaddressable)?,
        order_key(&order, end).ok_or(CaptureError::Unaddressable)?,
    );
    if end_key <= start_key {
        return Err(CaptureError::Collapsed);
    }

    let resolved = ResolvedRange { start, end };
    let text = resolved.text(doc).ok_or(CaptureError::Unaddressable)?;
    if text.trim().is_empty() {
        return Err(CaptureError::EmptyText);
    }

    let (start_path, start_offset) =
        locate(doc, start.0, start.1).ok_or(CaptureError::Unaddressable)?;
    let (end_path, end_offset) = locate(doc, end.0, end.1).ok_or(CaptureError::Unaddressable)?;
    let range = CfiRange::new(start_path, start_offset, end_path, end_offset)
        .map_err(|_| CaptureError::Unaddressable)?;

    let context = context_window(doc, &order, start, end, context_chars);

    Ok(CapturedSelection {
        range,
        text,
        context,
    })
}

/// Text of the whole document from `context_chars` before `start` to
/// `context_chars` after `end`, counted over text nodes in document order.
fn context_window(
    doc: &Document,
    order: &[NodeId],
    start: (NodeId, usize),
    end: (NodeId, usize),
    context_chars: usize,
) -> String {
    let mut full = String::new();
    let mut position = 0usize;
    let mut start_at = 0usize;
    let mut end_at = 0usize;
    for &node in order {
        if node == start.0 {
            start_at = position + start.1;
        }
        if node == end.0 {
            end_at = position + end.1;
        }
        if let Some(text) = doc.text(node) {
            full.push_str(text);
            position += text.chars().count();
        }
    }

    let from = start_at.saturating_sub(context_chars);
    let to = end_at.saturating_add(context_chars);
    full.chars().skip(from).take(to.saturating_sub(from)).collect()
}
