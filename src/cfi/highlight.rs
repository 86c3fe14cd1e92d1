//! Applying and removing highlight markers.

use std::collections::{BTreeSet, HashSet};

use crate::dom::{Document, NodeId};

use super::range::CfiRange;

/// Element name of a highlight marker.
pub const MARKER_TAG: &str = "mark";
/// Class carried by every marker.
pub const MARKER_CLASS: &str = "marginalia-highlight";
/// Attribute holding the highlight id.
pub const MARKER_ID_ATTR: &str = "data-highlight-id";

/// Whether `node` is a highlight marker element.
pub fn is_marker(doc: &Document, node: NodeId) -> bool {
    doc.attr(node, MARKER_ID_ATTR).is_some()
        && doc
            .attr(node, "class")
            .is_some_and(|c| c.split_ascii_whitespace().any(|w| w == MARKER_CLASS))
}

/// Outcome of applying a batch of highlights.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Newly wrapped, in batch order.
    pub applied: Vec<String>,
    /// Markers already present and left untouched.
    pub retained: Vec<String>,
    /// Could not be resolved against this document.
    pub skipped: Vec<String>,
    /// Markers unwrapped because their id was not in the batch.
    pub removed: Vec<String>,
}

/// Bring the document's markers in line with `highlights`.
///
/// Markers whose id is not in the batch are unwrapped first. Ids that already
/// have markers are kept as they are, so applying the same batch twice
/// changes nothing. Each remaining highlight is resolved and wrapped; one
/// that fails to resolve is skipped without affecting the rest.
pub fn apply_highlights<'a, I>(doc: &mut Document, highlights: I) -> ApplyReport
where
    I: IntoIterator<Item = (&'a str, &'a CfiRange)>,
{
    let batch: Vec<(&str, &CfiRange)> = highlights.into_iter().collect();
    let wanted: HashSet<&str> = batch.iter().map(|(id, _)| *id).collect();

    let mut report = ApplyReport::default();
    let stale: BTreeSet<String> = markers(doc)
        .into_iter()
        .map(|(id, _)| id)
        .filter(|id| !wanted.contains(id.as_str()))
        .collect();
    if !stale.is_empty() {
        let ids: Vec<&str> = stale.iter().map(String::as_str).collect();
        remove_highlights(doc, &ids);
        report.removed = stale.into_iter().collect();
    }

    let present: HashSet<String> = markers(doc).into_iter().map(|(id, _)| id).collect();
    let mut seen: HashSet<&str> = HashSet::new();

    for (id, range) in batch {
        if !seen.insert(id) {
            continue;
        }
        if present.contains(id) {
            report.retained.push(id.to_string());
            continue;
        }
        if apply_one(doc, id, range) {
            report.applied.push(id.to_string());
        } else {
            tracing::trace!(
                id,
                start = %range.start_path(),
                end = %range.end_path(),
                "Skipping unresolvable highlight"
            );
            report.skipped.push(id.to_string());
        }
    }

    tracing::debug!(
        applied = report.applied.len(),
        retained = report.retained.len(),
        skipped = report.skipped.len(),
        removed = report.removed.len(),
        "Applied highlights"
    );
    report
}

/// Wrap one range. Returns false, leaving the document untouched, when the
/// range does not resolve.
///
/// Every non-empty span is wrapped, whitespace between blocks included, so
/// the marked text always equals the text captured for the range.
fn apply_one(doc: &mut Document, id: &str, range: &CfiRange) -> bool {
    let Some(spans) = range.resolve(doc).and_then(|r| r.spans(doc)) else {
        return false;
    };
    let spans: Vec<_> = spans.into_iter().filter(|&(_, from, to)| to > from).collect();
    if spans.is_empty() {
        return false;
    }

    for (node, from, to) in spans {
        let len = doc.text(node).map(|t| t.chars().count()).unwrap_or(0);
        if to < len {
            doc.split_text(node, to);
        }
        let target = if from > 0 {
            match doc.split_text(node, from) {
                Some(middle) => middle,
                None => continue,
            }
        } else {
            node
        };
        let marker = doc.create_element(
            MARKER_TAG,
            vec![
                ("class".to_string(), MARKER_CLASS.to_string()),
                (MARKER_ID_ATTR.to_string(), id.to_string()),
            ],
        );
        doc.wrap(target, marker);
    }
    true
}

/// Unwrap every marker of the given ids. Returns the number of markers removed.
pub fn remove_highlights(doc: &mut Document, ids: &[&str]) -> usize {
    let targets: Vec<NodeId> = markers(doc)
        .into_iter()
        .filter(|(id, _)| ids.contains(&id.as_str()))
        .map(|(_, node)| node)
        .collect();
    unwrap_all(doc, &targets)
}

/// Unwrap every marker in the document.
pub fn clear_highlights(doc: &mut Document) -> usize {
    let targets: Vec<NodeId> = markers(doc).into_iter().map(|(_, node)| node).collect();
    unwrap_all(doc, &targets)
}

fn unwrap_all(doc: &mut Document, targets: &[NodeId]) -> usize {
    let mut parents = Vec::new();
    for &marker in targets {
        if let Some(parent) = doc.unwrap(marker) {
            parents.push(parent);
        }
    }
    // Parents may themselves be markers unwrapped later; normalize the
    // closest live ancestor of each.
    for parent in parents {
        let scope = std::iter::successors(Some(parent), |&n| doc.parent(n))
            .find(|&n| !is_marker(doc, n))
            .unwrap_or(parent);
        doc.normalize(scope);
    }
    targets.len()
}

/// Every marker element with its highlight id, in document order.
pub fn markers(doc: &Document) -> Vec<(String, NodeId)> {
    doc.descendants(doc.root())
        .filter(|&n| is_marker(doc, n))
        .filter_map(|n| Some((doc.attr(n, MARKER_ID_ATTR)?.to_string(), n)))
        .collect()
}

/// Text wrapped by the markers of one highlight, concatenated in order.
pub fn marker_text(doc: &Document, id: &str) -> String {
    markers(doc)
        .into_iter()
        .filter(|(marker_id, _)| marker_id == id)
        .map(|(_, node)| doc.text_content(node))
        .collect()
}

/// Highlight id of the innermost marker enclosing `node`, for click handling.
pub fn highlight_at(doc: &Document, node: NodeId) -> Option<&str> {
    let mut current = Some(node);
    while let Some(id) = current {
        if is_marker(doc, id) {
            return doc.attr(id, MARKER_ID_ATTR);
        }
        current = doc.parent(id);
    }
    None
}
