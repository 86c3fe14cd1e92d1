//! Reflow-resistant text addressing.
//!
//! A [`CfiRange`] names a span of text by sibling-ordinal paths plus
//! character offsets into text runs, so it survives re-rendering of the same
//! markup, font and layout changes, and the splitting that highlight markers
//! themselves cause. [`capture`] turns a live selection into a range;
//! [`apply_highlights`] wraps ranges in marker elements, idempotently per
//! highlight id.

mod capture;
mod highlight;
mod path;
mod range;

pub use capture::{Boundary, CapturedSelection, Selection, capture};
pub use highlight::{
    ApplyReport, MARKER_CLASS, MARKER_ID_ATTR, MARKER_TAG, apply_highlights, clear_highlights,
    highlight_at, is_marker, marker_text, markers, remove_highlights,
};
pub use path::{
    Bias, CfiPath, Unit, is_addressable_text, locate, logical_children, path_of_element, resolve,
    resolve_point,
};
pub use range::{CfiRange, ResolvedRange};

use thiserror::Error;

/// Invalid range or path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CfiError {
    #[error("invalid CFI path: {0:?}")]
    InvalidPath(String),

    #[error("range is empty")]
    Degenerate,

    #[error("range end precedes its start")]
    Reversed,
}

/// Why a selection could not be captured.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureError {
    #[error("selection is collapsed")]
    Collapsed,

    #[error("selection contains no text")]
    EmptyText,

    #[error("selection is not inside addressable text")]
    Unaddressable,
}
