//! Sibling-ordinal paths over the logical view of a document.
//!
//! The logical view is what an address must survive: highlight markers are
//! transparent (their children count as children of the marker's parent),
//! and consecutive text nodes coalesce into one text run. Ordinals are
//! 1-based and count elements and text runs that contain non-whitespace
//! text; whitespace-only runs are invisible to addressing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId};

use super::CfiError;
use super::highlight::is_marker;

/// A path from the document root to an element or text run, e.g. `2/4/1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CfiPath(Vec<u32>);

impl CfiPath {
    pub fn new(steps: Vec<u32>) -> Result<Self, CfiError> {
        if steps.is_empty() || steps.contains(&0) {
            return Err(CfiError::InvalidPath(
                steps.iter().map(u32::to_string).collect::<Vec<_>>().join("/"),
            ));
        }
        Ok(Self(steps))
    }

    pub fn steps(&self) -> &[u32] {
        &self.0
    }
}

impl fmt::Display for CfiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

impl FromStr for CfiPath {
    type Err = CfiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('/');
        let steps = trimmed
            .split('/')
            .map(|step| step.trim().parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| CfiError::InvalidPath(s.to_string()))?;
        Self::new(steps).map_err(|_| CfiError::InvalidPath(s.to_string()))
    }
}

impl TryFrom<String> for CfiPath {
    type Error = CfiError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CfiPath> for String {
    fn from(path: CfiPath) -> Self {
        path.to_string()
    }
}

// ============================================================================
// Logical view
// ============================================================================

/// One logical child: an element, or a run of adjacent text nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unit {
    Element(NodeId),
    TextRun(Vec<NodeId>),
}

/// Which side of a range a point belongs to. At a boundary between two text
/// segments, a start lands at the beginning of the later one and an end at
/// the end of the earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Start,
    End,
}

fn char_len(doc: &Document, node: NodeId) -> usize {
    doc.text(node).map(|t| t.chars().count()).unwrap_or(0)
}

fn flatten(doc: &Document, parent: NodeId, out: &mut Vec<NodeId>) {
    for child in doc.children(parent) {
        if is_marker(doc, child) {
            flatten(doc, child, out);
        } else {
            out.push(child);
        }
    }
}

/// Logical children of `parent`, whitespace runs included.
pub fn logical_children(doc: &Document, parent: NodeId) -> Vec<Unit> {
    let mut flat = Vec::new();
    flatten(doc, parent, &mut flat);

    let mut units: Vec<Unit> = Vec::new();
    for node in flat {
        if doc.is_text(node) {
            if let Some(Unit::TextRun(run)) = units.last_mut() {
                run.push(node);
            } else {
                units.push(Unit::TextRun(vec![node]));
            }
        } else if doc.is_element(node) {
            units.push(Unit::Element(node));
        }
    }
    units
}

/// Whether a unit takes part in ordinal counting.
pub fn is_counted(doc: &Document, unit: &Unit) -> bool {
    match unit {
        Unit::Element(_) => true,
        Unit::TextRun(run) => run
            .iter()
            .filter_map(|&n| doc.text(n))
            .any(|t| !t.trim().is_empty()),
    }
}

/// Nearest ancestor that is not a highlight marker.
pub fn logical_parent(doc: &Document, node: NodeId) -> Option<NodeId> {
    let mut parent = doc.parent(node)?;
    while is_marker(doc, parent) {
        parent = doc.parent(parent)?;
    }
    Some(parent)
}

/// The text run containing `text_node`.
pub fn run_of(doc: &Document, text_node: NodeId) -> Option<Vec<NodeId>> {
    let parent = logical_parent(doc, text_node)?;
    logical_children(doc, parent).into_iter().find_map(|unit| match unit {
        Unit::TextRun(run) if run.contains(&text_node) => Some(run),
        _ => None,
    })
}

/// Whether `text_node` belongs to a run with non-whitespace text.
pub fn is_addressable_text(doc: &Document, text_node: NodeId) -> bool {
    run_of(doc, text_node).is_some_and(|run| is_counted(doc, &Unit::TextRun(run)))
}

fn ordinal_in_parent(
    doc: &Document,
    parent: NodeId,
    target: &dyn Fn(&Unit) -> bool,
) -> Option<(u32, Unit)> {
    let mut ordinal = 0u32;
    for unit in logical_children(doc, parent) {
        if !is_counted(doc, &unit) {
            if target(&unit) {
                return None;
            }
            continue;
        }
        ordinal += 1;
        if target(&unit) {
            return Some((ordinal, unit));
        }
    }
    None
}

fn element_steps(doc: &Document, element: NodeId) -> Option<Vec<u32>> {
    let mut steps = Vec::new();
    let mut node = element;
    while node != doc.root() {
        let parent = logical_parent(doc, node)?;
        let (ordinal, _) = ordinal_in_parent(doc, parent, &|u| *u == Unit::Element(node))?;
        steps.push(ordinal);
        node = parent;
    }
    steps.reverse();
    Some(steps)
}

/// Path of an element.
pub fn path_of_element(doc: &Document, element: NodeId) -> Option<CfiPath> {
    CfiPath::new(element_steps(doc, element)?).ok()
}

/// Path and run offset of a point inside a text node.
///
/// The returned offset counts characters from the start of the text run,
/// so it is unaffected by markers splitting the run into several nodes.
pub fn locate(doc: &Document, text_node: NodeId, offset: usize) -> Option<(CfiPath, usize)> {
    if offset > char_len(doc, text_node) {
        return None;
    }
    let parent = logical_parent(doc, text_node)?;
    let is_run = |u: &Unit| matches!(u, Unit::TextRun(run) if run.contains(&text_node));
    let (ordinal, unit) = ordinal_in_parent(doc, parent, &is_run)?;
    let Unit::TextRun(run) = unit else { return None };

    let base: usize = run
        .iter()
        .take_while(|&&n| n != text_node)
        .map(|&n| char_len(doc, n))
        .sum();

    let mut steps = if parent == doc.root() {
        Vec::new()
    } else {
        element_steps(doc, parent)?
    };
    steps.push(ordinal);
    Some((CfiPath::new(steps).ok()?, base + offset))
}

/// Resolve a path to its unit.
pub fn resolve(doc: &Document, path: &CfiPath) -> Option<Unit> {
    let mut current = doc.root();
    let steps = path.steps();
    for (i, &step) in steps.iter().enumerate() {
        let unit = logical_children(doc, current)
            .into_iter()
            .filter(|u| is_counted(doc, u))
            .nth(step as usize - 1)?;
        if i + 1 == steps.len() {
            return Some(unit);
        }
        match unit {
            Unit::Element(element) => current = element,
            Unit::TextRun(_) => return None,
        }
    }
    None
}

/// Resolve a path and run offset to a concrete text node and offset in it.
/// Fails when the path does not reach a text run or the offset exceeds it.
pub fn resolve_point(
    doc: &Document,
    path: &CfiPath,
    offset: usize,
    bias: Bias,
) -> Option<(NodeId, usize)> {
    let Unit::TextRun(run) = resolve(doc, path)? else {
        return None;
    };

    let mut remaining = offset;
    for &segment in &run {
        let len = char_len(doc, segment);
        let inside = match bias {
            Bias::Start => remaining < len,
            Bias::End => remaining <= len && len > 0,
        };
        if inside {
            return Some((segment, remaining));
        }
        remaining = remaining.checked_sub(len)?;
    }

    // Start exactly at the end of the run, or an all-empty run.
    if remaining == 0 {
        let last = *run.last()?;
        return Some((last, char_len(doc, last)));
    }
    None
}
