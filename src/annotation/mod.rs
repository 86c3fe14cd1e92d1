//! Highlights, threads and messages.
//!
//! The in-memory shapes of the records an external catalog persists. A
//! selection first becomes a [`PendingHighlight`]; nothing changes until the
//! host commits it into the [`Annotations`] collection.

use serde::{Deserialize, Serialize};

use crate::cfi::{CapturedSelection, CfiRange};
use crate::util::generate_id;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A conversation attached to a highlight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// A committed highlight.
///
/// `cfi` is absent for legacy highlights that were never anchored; those
/// are listed but never drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,
    pub chapter_id: String,
    pub text: String,
    #[serde(default)]
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfi: Option<CfiRange>,
    #[serde(default)]
    pub threads: Vec<Thread>,
}

/// A captured selection waiting for the host to commit or discard it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingHighlight {
    pub chapter_id: String,
    pub text: String,
    pub context: String,
    pub cfi: CfiRange,
}

impl PendingHighlight {
    pub fn from_capture(chapter_id: impl Into<String>, captured: CapturedSelection) -> Self {
        Self {
            chapter_id: chapter_id.into(),
            text: captured.text,
            context: captured.context,
            cfi: captured.range,
        }
    }

    /// Turn the selection into a highlight with a fresh identifier.
    pub fn commit(self) -> Highlight {
        Highlight {
            id: generate_id("hl"),
            chapter_id: self.chapter_id,
            text: self.text,
            context: self.context,
            cfi: Some(self.cfi),
            threads: Vec::new(),
        }
    }
}

/// All highlights of one book, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotations {
    highlights: Vec<Highlight>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.highlights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Highlight> {
        self.highlights.iter()
    }

    /// Add a highlight, replacing any with the same id.
    pub fn add(&mut self, highlight: Highlight) {
        match self.highlights.iter_mut().find(|h| h.id == highlight.id) {
            Some(existing) => *existing = highlight,
            None => self.highlights.push(highlight),
        }
    }

    /// Commit a pending selection. Returns the new highlight's id.
    pub fn commit(&mut self, pending: PendingHighlight) -> String {
        let highlight = pending.commit();
        let id = highlight.id.clone();
        self.highlights.push(highlight);
        id
    }

    /// Remove a highlight together with its threads.
    pub fn remove(&mut self, id: &str) -> Option<Highlight> {
        let index = self.highlights.iter().position(|h| h.id == id)?;
        Some(self.highlights.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&Highlight> {
        self.highlights.iter().find(|h| h.id == id)
    }

    pub fn for_chapter<'a>(
        &'a self,
        chapter_id: &'a str,
    ) -> impl Iterator<Item = &'a Highlight> + 'a {
        self.highlights.iter().filter(move |h| h.chapter_id == chapter_id)
    }

    /// The batch to hand to [`crate::cfi::apply_highlights`] when a chapter
    /// renders: every anchored highlight of that chapter.
    pub fn ranges_for_chapter<'a>(
        &'a self,
        chapter_id: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a CfiRange)> + 'a {
        self.for_chapter(chapter_id)
            .filter_map(|h| Some((h.id.as_str(), h.cfi.as_ref()?)))
    }

    /// Start a new thread on a highlight. Returns the thread id.
    pub fn add_thread(&mut self, highlight_id: &str) -> Option<String> {
        let highlight = self.highlights.iter_mut().find(|h| h.id == highlight_id)?;
        let id = generate_id("th");
        highlight.threads.push(Thread {
            id: id.clone(),
            messages: Vec::new(),
        });
        Some(id)
    }

    /// Append a message to a thread. Returns false when either id is unknown.
    pub fn add_message(&mut self, highlight_id: &str, thread_id: &str, message: Message) -> bool {
        let thread = self
            .highlights
            .iter_mut()
            .find(|h| h.id == highlight_id)
            .and_then(|h| h.threads.iter_mut().find(|t| t.id == thread_id));
        match thread {
            Some(thread) => {
                thread.messages.push(message);
                true
            }
            None => false,
        }
    }
}
