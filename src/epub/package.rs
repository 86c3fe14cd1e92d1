//! OPF package document parsing: metadata, manifest, spine.

use std::collections::HashMap;

use crate::book::Metadata;
use crate::markup::{Token, element_text, first_element_text, tokenize};
use crate::util::collapse_whitespace;

pub const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// A manifest item. `id` and `href` are located independently of attribute order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

impl ManifestItem {
    pub fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|p| p.split_ascii_whitespace().any(|w| w == property))
    }
}

/// Manifest items in document order with id lookup.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    items: Vec<ManifestItem>,
    by_id: HashMap<String, usize>,
}

impl Manifest {
    fn push(&mut self, item: ManifestItem) {
        // First declaration of an id wins.
        if !self.by_id.contains_key(&item.id) {
            self.by_id.insert(item.id.clone(), self.items.len());
            self.items.push(item);
        }
    }

    pub fn get(&self, id: &str) -> Option<&ManifestItem> {
        self.by_id.get(id).map(|&i| &self.items[i])
    }

    /// Href for a manifest id.
    pub fn href(&self, id: &str) -> Option<&str> {
        self.get(id).map(|item| item.href.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item flagged as the navigation document.
    pub fn nav_item(&self) -> Option<&ManifestItem> {
        self.items.iter().find(|item| item.has_property("nav"))
    }
}

/// One `itemref` of the spine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineRef {
    pub idref: String,
    pub linear: bool,
}

/// A parsed package document.
#[derive(Debug, Clone, Default)]
pub struct PackageDocument {
    pub metadata: Metadata,
    pub manifest: Manifest,
    pub spine: Vec<SpineRef>,
    /// The spine's `toc` attribute (manifest id of the NCX).
    pub spine_toc: Option<String>,
}

impl PackageDocument {
    pub fn parse(content: &str) -> Self {
        let tokens = tokenize(content);
        let mut package = PackageDocument {
            metadata: parse_metadata(&tokens),
            ..Default::default()
        };
        let mut epub2_cover_id = None;

        for token in &tokens {
            let Some(tag) = token.tag() else { continue };
            match tag.local_name() {
                "item" => {
                    let (Some(id), Some(href)) = (tag.attr("id"), tag.attr("href")) else {
                        continue;
                    };
                    if id.is_empty() {
                        continue;
                    }
                    package.manifest.push(ManifestItem {
                        id: id.to_string(),
                        href: href.trim().to_string(),
                        media_type: tag.attr("media-type").unwrap_or_default().to_string(),
                        properties: tag.attr("properties").map(str::to_string),
                    });
                }
                "itemref" => {
                    if let Some(idref) = tag.attr("idref") {
                        package.spine.push(SpineRef {
                            idref: idref.to_string(),
                            linear: !tag
                                .attr("linear")
                                .is_some_and(|l| l.eq_ignore_ascii_case("no")),
                        });
                    }
                }
                "spine" => {
                    package.spine_toc = tag.attr("toc").map(str::to_string);
                }
                "meta" if tag.attr("name").is_some_and(|n| n == "cover") => {
                    epub2_cover_id = tag.attr("content").map(str::to_string);
                }
                _ => {}
            }
        }

        // EPUB 3 cover-image property takes priority over the EPUB 2 meta.
        package.metadata.cover_image = package
            .manifest
            .iter()
            .find(|item| item.has_property("cover-image"))
            .or_else(|| epub2_cover_id.and_then(|id| package.manifest.get(&id)))
            .map(|item| item.href.clone());

        package
    }

    /// Manifest href of the navigation document.
    pub fn nav_href(&self) -> Option<&str> {
        self.manifest.nav_item().map(|item| item.href.as_str())
    }

    /// Manifest href of the legacy NCX, by explicit spine reference first,
    /// then by media type.
    pub fn ncx_href(&self) -> Option<&str> {
        self.spine_toc
            .as_deref()
            .and_then(|id| self.manifest.href(id))
            .or_else(|| {
                self.manifest
                    .iter()
                    .find(|item| item.media_type.eq_ignore_ascii_case(NCX_MEDIA_TYPE))
                    .map(|item| item.href.as_str())
            })
    }
}

fn parse_metadata(tokens: &[Token]) -> Metadata {
    let subjects = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_open("subject"))
        .map(|(i, _)| collapse_whitespace(&element_text(&tokens[i + 1..], "subject")))
        .filter(|s| !s.is_empty())
        .collect();

    Metadata {
        title: first_element_text(tokens, "title"),
        author: first_element_text(tokens, "creator"),
        language: first_element_text(tokens, "language"),
        publisher: first_element_text(tokens, "publisher"),
        description: first_element_text(tokens, "description"),
        identifier: first_element_text(tokens, "identifier"),
        date: first_element_text(tokens, "date"),
        subjects,
        cover_image: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPF: &str = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>  Test &amp; Book </dc:title>
    <dc:creator>Author One</dc:creator>
    <dc:creator>Author Two</dc:creator>
    <dc:language>en</dc:language>
    <dc:identifier>urn:isbn:1234567890</dc:identifier>
    <dc:publisher>Test Publisher</dc:publisher>
    <dc:description>A test book description.</dc:description>
    <dc:subject>Fiction</dc:subject>
    <dc:subject>Adventure</dc:subject>
    <dc:date>2024-01-15</dc:date>
  </metadata>
  <manifest>
    <item href="nav.xhtml" properties="nav" id="nav" media-type="application/xhtml+xml"/>
    <item media-type="application/xhtml+xml" id="c1" href="text/c1.xhtml"/>
    <item id="c2" href="text/c2.xhtml" media-type="application/xhtml+xml"></item>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    <item id="cover" href="images/cover.jpg" media-type="image/jpeg" properties="cover-image"/>
  </manifest>
  <spine toc="ncx">
    <itemref idref="c1"/>
    <itemref idref="c2" linear="no"/>
  </spine>
</package>"#;

    #[test]
    fn test_parse_metadata() {
        let package = PackageDocument::parse(OPF);
        let m = &package.metadata;
        assert_eq!(m.title.as_deref(), Some("Test & Book"));
        assert_eq!(m.author.as_deref(), Some("Author One"));
        assert_eq!(m.language.as_deref(), Some("en"));
        assert_eq!(m.publisher.as_deref(), Some("Test Publisher"));
        assert_eq!(m.description.as_deref(), Some("A test book description."));
        assert_eq!(m.identifier.as_deref(), Some("urn:isbn:1234567890"));
        assert_eq!(m.date.as_deref(), Some("2024-01-15"));
        assert_eq!(m.subjects, vec!["Fiction", "Adventure"]);
        assert_eq!(m.cover_image.as_deref(), Some("images/cover.jpg"));
    }

    #[test]
    fn test_manifest_ignores_attribute_order() {
        let package = PackageDocument::parse(OPF);
        assert_eq!(package.manifest.len(), 5);
        assert_eq!(package.manifest.href("c1"), Some("text/c1.xhtml"));
        assert_eq!(package.manifest.href("c2"), Some("text/c2.xhtml"));
        assert_eq!(package.nav_href(), Some("nav.xhtml"));
        assert_eq!(package.ncx_href(), Some("toc.ncx"));
    }

    #[test]
    fn test_spine_order_and_linear() {
        let package = PackageDocument::parse(OPF);
        assert_eq!(
            package.spine,
            vec![
                SpineRef { idref: "c1".into(), linear: true },
                SpineRef { idref: "c2".into(), linear: false },
            ]
        );
    }

    #[test]
    fn test_missing_metadata_is_absent() {
        let package =
            PackageDocument::parse("<package><metadata><dc:title></dc:title></metadata></package>");
        assert_eq!(package.metadata, Metadata::default());
        assert!(package.spine.is_empty());
        assert_eq!(package.nav_href(), None);
        assert_eq!(package.ncx_href(), None);
    }

    #[test]
    fn test_ncx_found_by_media_type_without_spine_toc() {
        let package = PackageDocument::parse(concat!(
            r#"<package><manifest><item id="t" href="toc.ncx" "#,
            r#"media-type="application/x-dtbncx+xml"/></manifest><spine/></package>"#,
        ));
        assert_eq!(package.ncx_href(), Some("toc.ncx"));
    }

    #[test]
    fn test_epub2_cover_meta() {
        let package = PackageDocument::parse(
            r#"<package><metadata><meta name="cover" content="cover-id"/></metadata>
<manifest><item id="cover-id" href="cover.png" media-type="image/png"/></manifest></package>"#,
        );
        assert_eq!(package.metadata.cover_image.as_deref(), Some("cover.png"));
    }
}
