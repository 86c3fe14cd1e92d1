//! Persisted text ranges.

use serde::{Deserialize, Serialize};

use crate::dom::{Document, NodeId};

use super::CfiError;
use super::path::{Bias, CfiPath, resolve_point};

/// A text range: two path/offset pairs, offsets counted in characters from
/// the start of the addressed text run.
///
/// Construction rejects empty and reversed ranges. A range never changes;
/// a new selection produces a new range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawRange")]
pub struct CfiRange {
    start_path: CfiPath,
    start_offset: usize,
    end_path: CfiPath,
    end_offset: usize,
}

/// Unvalidated wire form.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRange {
    start_path: CfiPath,
    start_offset: usize,
    end_path: CfiPath,
    end_offset: usize,
}

impl TryFrom<RawRange> for CfiRange {
    type Error = CfiError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        CfiRange::new(raw.start_path, raw.start_offset, raw.end_path, raw.end_offset)
    }
}

impl CfiRange {
    pub fn new(
        start_path: CfiPath,
        start_offset: usize,
        end_path: CfiPath,
        end_offset: usize,
    ) -> Result<Self, CfiError> {
        match start_path.cmp(&end_path) {
            std::cmp::Ordering::Greater => return Err(CfiError::Reversed),
            std::cmp::Ordering::Equal if start_offset == end_offset => {
                return Err(CfiError::Degenerate);
            }
            std::cmp::Ordering::Equal if start_offset > end_offset => {
                return Err(CfiError::Reversed);
            }
            _ => {}
        }
        Ok(Self {
            start_path,
            start_offset,
            end_path,
            end_offset,
        })
    }

    pub fn start_path(&self) -> &CfiPath {
        &self.start_path
    }

    pub fn start_offset(&self) -> usize {
        self.start_offset
    }

    pub fn end_path(&self) -> &CfiPath {
        &self.end_path
    }

    pub fn end_offset(&self) -> usize {
        self.end_offset
    }

    /// Resolve against a (possibly re-rendered) document.
    pub fn resolve(&self, doc: &Document) -> Option<ResolvedRange> {
        let start = resolve_point(doc, &self.start_path, self.start_offset, Bias::Start)?;
        let end = resolve_point(doc, &self.end_path, self.end_offset, Bias::End)?;
        Some(ResolvedRange { start, end })
    }
}

/// A range resolved to concrete text nodes and in-node character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: (NodeId, usize),
    pub end: (NodeId, usize),
}

impl ResolvedRange {
    /// Covered span of every text node from start to end, in document order.
    /// Returns `None` when the end does not follow the start.
    pub fn spans(&self, doc: &Document) -> Option<Vec<(NodeId, usize, usize)>> {
        let (start_node, start_offset) = self.start;
        let (end_node, end_offset) = self.end;

        let mut spans = Vec::new();
        let mut inside = false;
        for node in doc.text_nodes(doc.root()) {
            if node == start_node {
                inside = true;
            }
            if !inside {
                continue;
            }
            let len = doc.text(node).map(|t| t.chars().count()).unwrap_or(0);
            let from = if node == start_node { start_offset } else { 0 };
            let to = if node == end_node { end_offset } else { len };
            if from > to {
                return None;
            }
            spans.push((node, from, to));
            if node == end_node {
                return Some(spans);
            }
        }
        None
    }

    /// Text covered by the range.
    pub fn text(&self, doc: &Document) -> Option<String> {
        let spans = self.spans(doc)?;
        let mut text = String::new();
        for (node, from, to) in spans {
            let Some(content) = doc.text(node) else { continue };
            text.extend(content.chars().skip(from).take(to - from));
        }
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse;

    fn path(s: &str) -> CfiPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_rejects_degenerate_and_reversed() {
        assert_eq!(
            CfiRange::new(path("1/1"), 3, path("1/1"), 3),
            Err(CfiError::Degenerate)
        );
        assert_eq!(
            CfiRange::new(path("1/1"), 4, path("1/1"), 3),
            Err(CfiError::Reversed)
        );
        assert_eq!(
            CfiRange::new(path("1/3"), 0, path("1/2"), 3),
            Err(CfiError::Reversed)
        );
        assert!(CfiRange::new(path("1/1"), 9, path("1/3"), 0).is_ok());
    }

    #[test]
    fn test_serde_camel_case() {
        let range = CfiRange::new(path("2/4/1"), 3, path("2/4/3"), 2).unwrap();
        let json = serde_json::to_value(&range).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "startPath": "2/4/1",
                "startOffset": 3,
                "endPath": "2/4/3",
                "endOffset": 2
            })
        );
        let back: CfiRange = serde_json::from_value(json).unwrap();
        assert_eq!(back, range);
    }

    #[test]
    fn test_deserialize_validates() {
        let degenerate = serde_json::json!({
            "startPath": "1/1", "startOffset": 2, "endPath": "1/1", "endOffset": 2
        });
        assert!(serde_json::from_value::<CfiRange>(degenerate).is_err());
        let bad_path = serde_json::json!({
            "startPath": "1/a", "startOffset": 0, "endPath": "1/1", "endOffset": 2
        });
        assert!(serde_json::from_value::<CfiRange>(bad_path).is_err());
    }

    #[test]
    fn test_resolve_and_text_across_elements() {
        let doc = parse("<p>The <b>light</b><i>house</i> keeper</p>");
        // Inside body > p: "The " (1), b (2), i (3), " keeper" (4)
        let range = CfiRange::new(path("1/2/1/2/1"), 0, path("1/2/1/3/1"), 5).unwrap();
        let resolved = range.resolve(&doc).unwrap();
        assert_eq!(resolved.text(&doc).as_deref(), Some("lighthouse"));
        assert_eq!(resolved.spans(&doc).unwrap().len(), 2);
    }

    #[test]
    fn test_spans_include_whitespace_between_blocks() {
        let doc = parse("<div><p>first para</p>\n<p>second</p></div>");
        let range = CfiRange::new(path("1/2/1/1/1"), 6, path("1/2/1/2/1"), 3).unwrap();
        let resolved = range.resolve(&doc).unwrap();
        let spans = resolved.spans(&doc).unwrap();
        assert_eq!(spans.len(), 3);
        assert_eq!(resolved.text(&doc).as_deref(), Some("para\nsec"));
    }

    #[test]
    fn test_resolve_offset_out_of_range() {
        let doc = parse("<p>short</p>");
        let range = CfiRange::new(path("1/2/1/1"), 0, path("1/2/1/1"), 10).unwrap();
        assert!(range.resolve(&doc).is_none());
    }
}
