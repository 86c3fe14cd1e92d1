//! # marginalia
//!
//! The core of an EPUB reader: archive ingestion, a navigable chapter model,
//! reflow-resistant text annotations, margin-note placement and
//! reading-position tracking.
//!
//! ## Quick Start
//!
//! ```no_run
//! use marginalia::Book;
//!
//! let bytes = std::fs::read("book.epub").unwrap();
//! let book = Book::open(&bytes).unwrap();
//! for chapter in book.chapters() {
//!     println!("{}{}", "  ".repeat(chapter.depth), chapter.title);
//! }
//! ```
//!
//! ## Highlighting
//!
//! Chapter markup is parsed into a [`dom::Document`]. A selection over it is
//! captured as a [`cfi::CfiRange`], which stays valid across re-renders and
//! can be drawn back onto a fresh parse:
//!
//! ```
//! use marginalia::cfi::{Selection, apply_highlights, capture};
//! use marginalia::dom::{parse, to_html};
//!
//! let mut doc = parse("<p>Call me Ishmael.</p>");
//! let text = doc.find_by_tag("p").and_then(|p| doc.first_child(p)).unwrap();
//! let captured = capture(&doc, &Selection::within(text, 8, 15), 500).unwrap();
//!
//! let mut fresh = parse("<p>Call me Ishmael.</p>");
//! apply_highlights(&mut fresh, [("hl-1", &captured.range)]);
//! assert!(to_html(&fresh).contains(">Ishmael</mark>"));
//! ```

pub mod annotation;
pub mod archive;
pub mod book;
pub mod cfi;
pub mod config;
pub mod dom;
pub mod epub;
pub mod error;
pub mod layout;
pub mod markup;
pub mod viewport;
pub(crate) mod util;

pub use annotation::{Annotations, Highlight, Message, PendingHighlight, Role, Thread};
pub use book::{Anchor, AnchorId, Book, BookState, Chapter, Metadata, TocSource};
pub use cfi::{CfiRange, apply_highlights, capture};
pub use config::ReaderConfig;
pub use error::{Error, Result};
pub use layout::{Column, MarginLayout, NoteInput, NotePlacement};
pub use viewport::{PositionReport, ReadingProgress, ViewportTracker, spawn_tracker};
