//! Trackable anchors within one loaded content file.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Chapter;
use crate::epub::paths::split_fragment;

/// A fragment target, or the start of the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorId {
    FileStart,
    Fragment(String),
}

impl AnchorId {
    /// Anchor for an href such as `ch1.xhtml#sec2`.
    pub fn from_href(href: &str) -> Self {
        match split_fragment(href).1 {
            Some(fragment) => AnchorId::Fragment(fragment.to_string()),
            None => AnchorId::FileStart,
        }
    }

    /// The element id targeted, if any.
    pub fn fragment(&self) -> Option<&str> {
        match self {
            AnchorId::FileStart => None,
            AnchorId::Fragment(f) => Some(f),
        }
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorId::FileStart => f.write_str("#top"),
            AnchorId::Fragment(id) => write!(f, "#{id}"),
        }
    }
}

/// A named point in a loaded document, owned by a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anchor {
    pub id: AnchorId,
    pub chapter_index: usize,
}

/// Build the anchors for the chapters whose content lives in `file_path`.
///
/// Chapters without a fragment map to the file-start sentinel; duplicate
/// anchors keep the first chapter that names them.
pub fn anchors_for_file(chapters: &[Chapter], file_path: &str) -> Vec<Anchor> {
    let mut anchors: Vec<Anchor> = Vec::new();
    for (index, chapter) in chapters.iter().enumerate() {
        if chapter.file_path != file_path {
            continue;
        }
        let id = match &chapter.fragment {
            Some(fragment) => AnchorId::Fragment(fragment.clone()),
            None => AnchorId::FileStart,
        };
        if anchors.iter().all(|a| a.id != id) {
            anchors.push(Anchor {
                id,
                chapter_index: index,
            });
        }
    }
    anchors
}
