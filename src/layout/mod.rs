//! Margin note placement.
//!
//! Notes want to sit level with their anchor. When the primary margin column
//! would push a note more than the threshold below its anchor, the note moves
//! to the overflow column instead, unless that column is backed up by more
//! than the threshold past the primary slot too. Placement is a single greedy
//! pass in anchor order and is recomputed from scratch on every change, so a
//! note may switch columns between runs.

use serde::{Deserialize, Serialize};

use crate::config::MarginConfig;

/// Which margin column a note is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Primary,
    Overflow,
}

/// A note to place: its anchor's position in document flow and its height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInput {
    pub id: String,
    pub ideal_offset: f64,
    pub height: f64,
}

impl NoteInput {
    pub fn new(id: impl Into<String>, ideal_offset: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            ideal_offset,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePlacement {
    pub id: String,
    pub ideal_offset: f64,
    pub offset: f64,
    pub column: Column,
    pub height: f64,
}

impl NotePlacement {
    /// How far the note was pushed below its anchor.
    pub fn displacement(&self) -> f64 {
        self.offset - self.ideal_offset
    }

    pub fn bottom(&self) -> f64 {
        self.offset + self.height
    }
}

/// Two-column greedy layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginLayout {
    /// Displacement beyond which a note tries the overflow column.
    pub overflow_threshold: f64,
    /// Vertical space kept between notes of one column.
    pub gap: f64,
}

impl Default for MarginLayout {
    fn default() -> Self {
        Self::from(&MarginConfig::default())
    }
}

impl From<&MarginConfig> for MarginLayout {
    fn from(config: &MarginConfig) -> Self {
        Self {
            overflow_threshold: config.overflow_threshold,
            gap: config.gap,
        }
    }
}

impl MarginLayout {
    pub fn new(overflow_threshold: f64, gap: f64) -> Self {
        Self {
            overflow_threshold,
            gap,
        }
    }

    /// Place every note. The result is in the same order as `notes`.
    pub fn layout(&self, notes: &[NoteInput]) -> Vec<NotePlacement> {
        let mut order: Vec<usize> = (0..notes.len()).collect();
        order.sort_by(|&a, &b| notes[a].ideal_offset.total_cmp(&notes[b].ideal_offset));

        let mut primary_cursor = 0.0f64;
        let mut overflow_cursor = 0.0f64;
        let mut placed: Vec<Option<NotePlacement>> = vec![None; notes.len()];

        for index in order {
            let note = &notes[index];
            let height = note.height.max(0.0);
            let primary_slot = note.ideal_offset.max(primary_cursor);
            let overflow_slot = note.ideal_offset.max(overflow_cursor);

            let displaced = primary_slot - note.ideal_offset > self.overflow_threshold;
            let overflow_open = overflow_slot <= primary_slot + self.overflow_threshold;
            let (column, offset) = if displaced && overflow_open {
                overflow_cursor = overflow_slot + height + self.gap;
                (Column::Overflow, overflow_slot)
            } else {
                primary_cursor = primary_slot + height + self.gap;
                (Column::Primary, primary_slot)
            };

            placed[index] = Some(NotePlacement {
                id: note.id.clone(),
                ideal_offset: note.ideal_offset,
                offset,
                column,
                height,
            });
        }

        placed.into_iter().flatten().collect()
    }
}
