//! Book and chapter model produced by the package parser.

mod anchor;

pub use anchor::{Anchor, AnchorId, anchors_for_file};

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use serde::Serialize;

use crate::archive::Archive;
use crate::config::ReaderConfig;
use crate::epub::{Manifest, SpineRef};
use crate::error::Result;

/// Book metadata (Dublin Core subset).
///
/// Each field holds the trimmed text of the first matching element in the
/// package document, or `None` when absent or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub identifier: Option<String>,
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
    /// Manifest href of the cover image.
    pub cover_image: Option<String>,
}

/// One entry of the reading order, as presented to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// Unique within a book.
    pub id: String,
    pub title: String,
    /// Href as written in the table of contents (relative, with fragment).
    pub href: String,
    /// Full path of the content document inside the archive.
    pub file_path: String,
    pub fragment: Option<String>,
    /// Dense from 0 in traversal order.
    pub order: usize,
    /// Table-of-contents nesting level (root entries are 0).
    pub depth: usize,
}

impl Chapter {
    pub(crate) fn new(
        order: usize,
        title: String,
        href: String,
        file_path: String,
        fragment: Option<String>,
        depth: usize,
    ) -> Self {
        Self {
            id: format!("chapter-{order}"),
            title,
            href,
            file_path,
            fragment,
            order,
            depth,
        }
    }
}

/// Which strategy produced the chapter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TocSource {
    Navigation,
    Ncx,
    Spine,
}

/// Whether the book has anything to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookState {
    Readable,
    /// The package parsed but produced no chapters.
    NoChapters,
}

/// An opened book: metadata, chapter list and the extracted archive.
///
/// Chapter content is decoded on first access and cached per content file.
#[derive(Debug)]
pub struct Book {
    pub metadata: Metadata,
    chapters: Vec<Chapter>,
    toc_source: TocSource,
    manifest: Manifest,
    spine: Vec<SpineRef>,
    package_path: String,
    archive: Archive,
    contents: HashMap<String, OnceLock<Arc<str>>>,
}

impl Book {
    /// Open a book from raw archive bytes with default configuration.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        crate::epub::open_book(bytes, &ReaderConfig::default())
    }

    /// Open a book from raw archive bytes.
    pub fn open_with(bytes: &[u8], config: &ReaderConfig) -> Result<Self> {
        crate::epub::open_book(bytes, config)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        metadata: Metadata,
        chapters: Vec<Chapter>,
        toc_source: TocSource,
        manifest: Manifest,
        spine: Vec<SpineRef>,
        package_path: String,
        archive: Archive,
    ) -> Self {
        let contents = chapters
            .iter()
            .map(|c| (c.file_path.clone(), OnceLock::new()))
            .collect();
        Self {
            metadata,
            chapters,
            toc_source,
            manifest,
            spine,
            package_path,
            archive,
            contents,
        }
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn chapter(&self, id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn chapter_index(&self, id: &str) -> Option<usize> {
        self.chapters.iter().position(|c| c.id == id)
    }

    pub fn toc_source(&self) -> TocSource {
        self.toc_source
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn spine(&self) -> &[SpineRef] {
        &self.spine
    }

    /// Archive path of the package document.
    pub fn package_path(&self) -> &str {
        &self.package_path
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    pub fn state(&self) -> BookState {
        if self.chapters.is_empty() {
            BookState::NoChapters
        } else {
            BookState::Readable
        }
    }

    /// Raw markup of a chapter's content file, loaded on first access.
    ///
    /// A content file missing from the archive yields empty content rather
    /// than an error.
    pub fn chapter_content(&self, id: &str) -> Option<&str> {
        let chapter = self.chapter(id)?;
        let slot = self.contents.get(&chapter.file_path)?;
        Some(slot.get_or_init(|| self.load_content(&chapter.file_path)))
    }

    /// Load every chapter's content now.
    pub fn preload(&self) {
        for chapter in &self.chapters {
            let _ = self.chapter_content(&chapter.id);
        }
    }

    fn load_content(&self, path: &str) -> Arc<str> {
        match self.archive.read_text(path) {
            Some(text) => Arc::from(text.as_ref()),
            None => {
                tracing::warn!(path, "Chapter file missing from archive; using empty content");
                Arc::from("")
            }
        }
    }
}
