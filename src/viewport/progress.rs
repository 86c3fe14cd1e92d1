//! Whole-book reading progress.

use serde::{Deserialize, Serialize};

use super::tracker::PositionReport;

/// Position in the book: a chapter and the scroll fraction within it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingProgress {
    pub chapter_index: usize,
    pub chapter_count: usize,
    pub scroll_fraction: f64,
}

impl ReadingProgress {
    pub fn new(chapter_index: usize, chapter_count: usize, scroll_fraction: f64) -> Self {
        Self {
            chapter_index,
            chapter_count,
            scroll_fraction: scroll_fraction.clamp(0.0, 1.0),
        }
    }

    pub fn from_report(report: &PositionReport, chapter_count: usize) -> Self {
        Self::new(report.chapter_index(), chapter_count, report.fraction)
    }

    /// Fraction of the whole book read, counting chapters as equal length.
    pub fn overall_fraction(&self) -> f64 {
        if self.chapter_count == 0 {
            return 0.0;
        }
        ((self.chapter_index as f64 + self.scroll_fraction) / self.chapter_count as f64).min(1.0)
    }

    /// In the last chapter and scrolled past `threshold`.
    pub fn is_finished(&self, threshold: f64) -> bool {
        self.chapter_count > 0
            && self.chapter_index + 1 >= self.chapter_count
            && self.scroll_fraction > threshold
    }
}
