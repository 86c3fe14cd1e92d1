//! Reading-position tracking.
//!
//! [`ViewportTracker`] decides which anchor of the loaded document best
//! represents where the reader is, debouncing bursts of visibility changes
//! and staying silent while the host scrolls programmatically.
//! [`spawn_tracker`] runs one on a tokio task behind a command channel.

mod actor;
mod progress;
mod tracker;

pub use actor::{TrackerCommand, TrackerHandle, spawn_tracker};
pub use progress::ReadingProgress;
pub use tracker::{AnchorBounds, PositionReport, ReportKind, TrackerState, ViewportTracker};
