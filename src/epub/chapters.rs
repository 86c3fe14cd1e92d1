//! Chapter list construction: navigation document, then NCX, then spine.

use tracing::{debug, warn};

use crate::archive::Archive;
use crate::book::{Chapter, TocSource};
use crate::dom;
use crate::util::collapse_whitespace;

use super::TocEntry;
use super::nav::parse_nav;
use super::ncx::parse_ncx;
use super::package::PackageDocument;
use super::paths::{is_external, parent_dir, resolve_href, split_fragment};

/// Build the ordered chapter list, trying each strategy in priority order.
///
/// Strategy failures (missing file, empty result) fall through to the next;
/// an empty spine yields an empty list with [`TocSource::Spine`].
pub fn build_chapters(
    archive: &Archive,
    package: &PackageDocument,
    package_path: &str,
) -> (Vec<Chapter>, TocSource) {
    let package_dir = parent_dir(package_path);

    if let Some(href) = package.nav_href() {
        let nav_path = resolve_href(package_dir, href);
        match archive.read_text(&nav_path) {
            Some(content) => {
                let chapters = chapters_from_toc(&parse_nav(&content), parent_dir(&nav_path));
                if !chapters.is_empty() {
                    debug!(
                        count = chapters.len(),
                        path = %nav_path,
                        "Chapters from navigation document"
                    );
                    return (chapters, TocSource::Navigation);
                }
                debug!(path = %nav_path, "Navigation document has no entries");
            }
            None => warn!(path = %nav_path, "Navigation document missing from archive"),
        }
    }

    if let Some(href) = package.ncx_href() {
        let ncx_path = resolve_href(package_dir, href);
        match archive.read_text(&ncx_path) {
            Some(content) => {
                let chapters = chapters_from_toc(&parse_ncx(&content), parent_dir(&ncx_path));
                if !chapters.is_empty() {
                    debug!(count = chapters.len(), path = %ncx_path, "Chapters from NCX");
                    return (chapters, TocSource::Ncx);
                }
                debug!(path = %ncx_path, "NCX has no entries");
            }
            None => warn!(path = %ncx_path, "NCX missing from archive"),
        }
    }

    let chapters = chapters_from_spine(archive, package, package_dir);
    debug!(count = chapters.len(), "Chapters from spine");
    (chapters, TocSource::Spine)
}

/// Convert TOC entries into chapters. Hrefs resolve against the TOC
/// document's directory; external links are skipped.
fn chapters_from_toc(entries: &[TocEntry], base_dir: &str) -> Vec<Chapter> {
    let mut chapters = Vec::with_capacity(entries.len());
    for entry in entries {
        if is_external(&entry.href) {
            debug!(href = %entry.href, "Skipping external TOC link");
            continue;
        }
        let (file, fragment) = split_fragment(&entry.href);
        if file.is_empty() {
            continue;
        }
        chapters.push(Chapter::new(
            chapters.len(),
            entry.title.clone(),
            entry.href.clone(),
            resolve_href(base_dir, file),
            fragment.map(str::to_string),
            entry.depth,
        ));
    }
    chapters
}

fn chapters_from_spine(
    archive: &Archive,
    package: &PackageDocument,
    package_dir: &str,
) -> Vec<Chapter> {
    let mut chapters = Vec::with_capacity(package.spine.len());
    for itemref in &package.spine {
        let Some(href) = package.manifest.href(&itemref.idref) else {
            debug!(idref = %itemref.idref, "Spine item not in manifest");
            continue;
        };
        let (file, fragment) = split_fragment(href);
        let file_path = resolve_href(package_dir, file);
        let order = chapters.len();
        let title = archive
            .read_text(&file_path)
            .and_then(|content| heading_title(&content))
            .unwrap_or_else(|| format!("Chapter {}", order + 1));

        chapters.push(Chapter::new(
            order,
            title,
            href.to_string(),
            file_path,
            fragment.map(str::to_string),
            0,
        ));
    }
    chapters
}

/// First `h1`, then `h2`, then `title` text of a content document.
fn heading_title(content: &str) -> Option<String> {
    let doc = dom::parse(content);
    ["h1", "h2", "title"].into_iter().find_map(|name| {
        let text = collapse_whitespace(&doc.text_content(doc.find_by_tag(name)?));
        (!text.is_empty()).then_some(text)
    })
}
