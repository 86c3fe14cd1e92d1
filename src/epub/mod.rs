//! EPUB package and navigation parsing.
//!
//! [`open_book`] runs the whole pipeline: extract the archive, follow
//! `META-INF/container.xml` to the package document, parse metadata,
//! manifest and spine, then build the chapter list from the navigation
//! document, the legacy NCX, or the spine, in that order.

mod chapters;
mod container;
mod nav;
mod ncx;
mod package;
pub mod paths;

pub use chapters::build_chapters;
pub use container::{CONTAINER_PATH, parse_container};
pub use nav::parse_nav;
pub use ncx::parse_ncx;
pub use package::{Manifest, ManifestItem, PackageDocument, SpineRef};

use tracing::{debug, instrument};

use crate::archive::Archive;
use crate::book::Book;
use crate::config::ReaderConfig;
use crate::error::{Error, Result};

/// A flattened table-of-contents entry. `href` is relative to the document
/// that declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub title: String,
    pub href: String,
    pub depth: usize,
}

/// Open a book from raw archive bytes.
///
/// Fails only on archive-level or package-level errors; table-of-contents
/// problems fall through to the next strategy and a book with no chapters is
/// returned as such (see [`Book::state`]).
#[instrument(skip_all, fields(len = bytes.len()))]
pub fn open_book(bytes: &[u8], config: &ReaderConfig) -> Result<Book> {
    let archive = Archive::from_bytes_with(bytes, &config.archive)?;

    let package_path = {
        let container = archive
            .read_text(CONTAINER_PATH)
            .ok_or(Error::MissingContainer)?;
        parse_container(&container)?
    };
    debug!(path = %package_path, "Found package document");

    let package = {
        let text = archive
            .read_text(&package_path)
            .ok_or_else(|| Error::MissingPackage(package_path.clone()))?;
        PackageDocument::parse(&text)
    };
    debug!(
        manifest = package.manifest.len(),
        spine = package.spine.len(),
        "Parsed package document"
    );

    let (chapters, toc_source) = build_chapters(&archive, &package, &package_path);
    if chapters.is_empty() {
        tracing::warn!("Book has no chapters");
    }

    let PackageDocument {
        metadata,
        manifest,
        spine,
        ..
    } = package;

    Ok(Book::assemble(
        metadata,
        chapters,
        toc_source,
        manifest,
        spine,
        package_path,
        archive,
    ))
}
