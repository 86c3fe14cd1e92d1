//! Debounced current-anchor detection.
//!
//! A synchronous state machine: callers feed it visibility observations,
//! scroll samples and navigation begin/end calls with the current time, and
//! poll it when [`ViewportTracker::next_deadline`] passes. It never reads a
//! clock itself.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::book::Anchor;
use crate::config::ViewportConfig;

/// Edges of an anchor relative to the top of the active zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnchorBounds {
    pub top: f64,
    pub bottom: f64,
}

impl AnchorBounds {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Observation {
    visible: bool,
    bounds: AnchorBounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// No anchors registered.
    Idle,
    /// Reporting; `deadline` is set while a debounce is pending.
    Tracking { deadline: Option<Instant> },
    /// Programmatic navigation in progress; `settle_at` is set once it has
    /// ended.
    Suppressed { settle_at: Option<Instant> },
}

/// Why a report was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// The current anchor changed, or was recomputed after navigation settled.
    Anchor,
    /// A scroll sample within the current anchor's chapter.
    Progress,
}

/// The current reading position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionReport {
    pub kind: ReportKind,
    pub anchor: Anchor,
    /// Scroll position within the chapter, 0 to 1.
    pub fraction: f64,
}

impl PositionReport {
    pub fn chapter_index(&self) -> usize {
        self.anchor.chapter_index
    }
}

#[derive(Debug, Clone)]
pub struct ViewportTracker {
    debounce: Duration,
    settle: Duration,
    top_tolerance: f64,
    state: TrackerState,
    anchors: Vec<Anchor>,
    observations: Vec<Option<Observation>>,
    current: Option<usize>,
    fraction: f64,
}

impl ViewportTracker {
    pub fn new(config: &ViewportConfig) -> Self {
        Self {
            debounce: config.debounce(),
            settle: config.settle(),
            top_tolerance: config.top_tolerance,
            state: TrackerState::Idle,
            anchors: Vec::new(),
            observations: Vec::new(),
            current: None,
            fraction: 0.0,
        }
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// The last reported anchor.
    pub fn current(&self) -> Option<&Anchor> {
        self.current.and_then(|i| self.anchors.get(i))
    }

    /// Register the anchors of a newly loaded document. Clears observations
    /// and the current anchor; an ongoing navigation stays suppressed.
    pub fn set_anchors(&mut self, anchors: Vec<Anchor>) {
        self.observations = vec![None; anchors.len()];
        self.anchors = anchors;
        self.current = None;
        self.fraction = 0.0;
        self.state = match self.state {
            TrackerState::Suppressed { settle_at } => TrackerState::Suppressed { settle_at },
            _ if self.anchors.is_empty() => TrackerState::Idle,
            _ => TrackerState::Tracking { deadline: None },
        };
        tracing::trace!(count = self.anchors.len(), state = ?self.state, "Anchors registered");
    }

    /// Record a visibility observation. Returns false, changing nothing, for
    /// an unknown index or a repeat of the recorded observation.
    pub fn on_visibility(
        &mut self,
        index: usize,
        visible: bool,
        bounds: AnchorBounds,
        now: Instant,
    ) -> bool {
        let Some(slot) = self.observations.get_mut(index) else {
            tracing::trace!(index, "Ignoring visibility for unknown anchor");
            return false;
        };
        let observation = Observation { visible, bounds };
        if *slot == Some(observation) {
            return false;
        }
        *slot = Some(observation);

        if let TrackerState::Tracking { deadline } = &mut self.state {
            *deadline = Some(now + self.debounce);
        }
        true
    }

    /// Record a scroll sample. Not debounced: yields a progress report at
    /// once when an anchor is current and reporting is not suppressed.
    pub fn on_scroll(&mut self, fraction: f64, _now: Instant) -> Option<PositionReport> {
        self.fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        if !matches!(self.state, TrackerState::Tracking { .. }) {
            return None;
        }
        self.report(self.current?, ReportKind::Progress)
    }

    /// Enter suppression. A pending debounce is discarded, not delivered late.
    pub fn begin_programmatic_navigation(&mut self) {
        self.state = TrackerState::Suppressed { settle_at: None };
        tracing::trace!("Programmatic navigation started");
    }

    /// Schedule the return to tracking after the settle delay.
    pub fn end_programmatic_navigation(&mut self, now: Instant) {
        if let TrackerState::Suppressed { settle_at } = &mut self.state {
            *settle_at = Some(now + self.settle);
            tracing::trace!("Programmatic navigation ended; settling");
        }
    }

    /// When [`poll`](Self::poll) next needs to run.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            TrackerState::Tracking { deadline } => deadline,
            TrackerState::Suppressed { settle_at } => settle_at,
            TrackerState::Idle => None,
        }
    }

    /// Fire any expired timer.
    ///
    /// An expired debounce reports the best anchor if it differs from the
    /// last one reported. An expired settle delay resumes tracking and
    /// reports the best anchor unconditionally.
    pub fn poll(&mut self, now: Instant) -> Option<PositionReport> {
        match self.state {
            TrackerState::Tracking { deadline: Some(at) } if now >= at => {
                self.state = TrackerState::Tracking { deadline: None };
                let best = self.best_anchor()?;
                if self.current == Some(best) {
                    return None;
                }
                self.current = Some(best);
                self.report(best, ReportKind::Anchor)
            }
            TrackerState::Suppressed { settle_at: Some(at) } if now >= at => {
                self.state = if self.anchors.is_empty() {
                    TrackerState::Idle
                } else {
                    TrackerState::Tracking { deadline: None }
                };
                tracing::trace!("Navigation settled; forcing recompute");
                let best = self.best_anchor()?;
                self.current = Some(best);
                self.report(best, ReportKind::Anchor)
            }
            _ => None,
        }
    }

    fn report(&self, index: usize, kind: ReportKind) -> Option<PositionReport> {
        Some(PositionReport {
            kind,
            anchor: self.anchors.get(index)?.clone(),
            fraction: self.fraction,
        })
    }

    /// Index of the anchor that best represents the reading position.
    ///
    /// Among visible anchors, the smallest top edge not above the tolerance;
    /// failing that, the visible anchor lowest on screen. With nothing
    /// visible, the anchor that most recently scrolled off the top (largest
    /// negative bottom edge).
    pub fn best_anchor(&self) -> Option<usize> {
        let observed = || {
            self.observations
                .iter()
                .enumerate()
                .filter_map(|(i, o)| o.map(|o| (i, o)))
        };
        let visible = || observed().filter(|(_, o)| o.visible);

        visible()
            .filter(|(_, o)| o.bounds.top >= self.top_tolerance)
            .min_by(|(_, a), (_, b)| a.bounds.top.total_cmp(&b.bounds.top))
            .or_else(|| visible().max_by(|(_, a), (_, b)| a.bounds.top.total_cmp(&b.bounds.top)))
            .or_else(|| {
                observed()
                    .filter(|(_, o)| o.bounds.bottom < 0.0)
                    .max_by(|(_, a), (_, b)| a.bounds.bottom.total_cmp(&b.bounds.bottom))
            })
            .map(|(i, _)| i)
    }
}
