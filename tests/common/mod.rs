//! In-memory EPUB fixtures for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// How an entry's payload is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Stored,
    Deflated,
}

/// Builds an EPUB archive entry by entry.
pub struct EpubBuilder {
    entries: Vec<(String, Vec<u8>, Mode)>,
    streaming: bool,
}

impl EpubBuilder {
    /// Starts with the stored `mimetype` entry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            streaming: false,
        }
        .file_with("mimetype", "application/epub+zip", Mode::Stored)
    }

    /// Like [`EpubBuilder::new`], but every entry is written in streaming
    /// mode: zero sizes in the local header and a signed data descriptor.
    pub fn streaming() -> Self {
        Self {
            streaming: true,
            ..Self::new()
        }
    }

    /// Adds `META-INF/container.xml` pointing at `package_path`.
    pub fn container(self, package_path: &str) -> Self {
        self.file("META-INF/container.xml", &container_xml(package_path))
    }

    pub fn file(self, name: &str, content: &str) -> Self {
        self.file_with(name, content, Mode::Deflated)
    }

    pub fn file_with(self, name: &str, content: &str, mode: Mode) -> Self {
        self.bytes_with(name, content.as_bytes(), mode)
    }

    pub fn bytes_with(mut self, name: &str, data: &[u8], mode: Mode) -> Self {
        self.entries.push((name.to_string(), data.to_vec(), mode));
        self
    }

    pub fn build(self) -> Vec<u8> {
        if self.streaming {
            let mut writer = ZipWriter::new_stream(Vec::new());
            write_entries(&mut writer, &self.entries);
            writer.finish().unwrap().into_inner()
        } else {
            let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
            write_entries(&mut writer, &self.entries);
            writer.finish().unwrap().into_inner()
        }
    }
}

fn write_entries<W: Write + Seek>(writer: &mut ZipWriter<W>, entries: &[(String, Vec<u8>, Mode)]) {
    for (name, data, mode) in entries {
        let method = match mode {
            Mode::Stored => CompressionMethod::Stored,
            Mode::Deflated => CompressionMethod::Deflated,
        };
        let options = SimpleFileOptions::default().compression_method(method);
        writer.start_file(name.as_str(), options).unwrap();
        writer.write_all(data).unwrap();
    }
}

pub fn container_xml(package_path: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{package_path}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#
    )
}

/// A manifest entry: id, href, media type, properties.
pub type Item<'a> = (&'a str, &'a str, &'a str, Option<&'a str>);

pub const XHTML: &str = "application/xhtml+xml";
pub const NCX: &str = "application/x-dtbncx+xml";

pub fn package_xml(
    title: &str,
    items: &[Item<'_>],
    spine: &[&str],
    spine_toc: Option<&str>,
) -> String {
    let mut manifest = String::new();
    for (id, href, media_type, properties) in items {
        let props = properties.map(|p| format!(r#" properties="{p}""#)).unwrap_or_default();
        manifest.push_str(&format!(
            "    <item id=\"{id}\" href=\"{href}\" media-type=\"{media_type}\"{props}/>\n"
        ));
    }
    let itemrefs: String = spine
        .iter()
        .map(|idref| format!("    <itemref idref=\"{idref}\"/>\n"))
        .collect();
    let toc = spine_toc.map(|t| format!(r#" toc="{t}""#)).unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{title}</dc:title>
    <dc:creator>Fixture Author</dc:creator>
    <dc:language>en</dc:language>
    <dc:identifier id="uid">urn:uuid:fixture</dc:identifier>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine{toc}>
{itemrefs}  </spine>
</package>"#
    )
}

pub fn chapter_xhtml(heading: Option<&str>, body: &str) -> String {
    let heading = heading.map(|h| format!("<h1>{h}</h1>")).unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Untitled</title></head>
<body>{heading}{body}</body>
</html>"#
    )
}

/// A navigation document from (label, href, depth) entries in order.
pub fn nav_xhtml(entries: &[(&str, &str, usize)]) -> String {
    let mut out = String::from(concat!(
        r#"<html xmlns="http://www.w3.org/1999/xhtml" "#,
        r#"xmlns:epub="http://www.idpf.org/2007/ops">"#,
        r#"<body><nav epub:type="toc"><ol>"#,
    ));
    let mut depth = 0usize;
    for (i, (label, href, level)) in entries.iter().enumerate() {
        if i > 0 {
            if *level > depth {
                out.push_str("<ol>");
            } else {
                out.push_str("</li>");
                for _ in *level..depth {
                    out.push_str("</ol></li>");
                }
            }
        }
        depth = *level;
        out.push_str(&format!(r#"<li><a href="{href}">{label}</a>"#));
    }
    if !entries.is_empty() {
        out.push_str("</li>");
        for _ in 0..depth {
            out.push_str("</ol></li>");
        }
    }
    out.push_str("</ol></nav></body></html>");
    out
}

/// A two-chapter book, written in streaming mode, whose chapter list comes
/// from the spine.
pub fn spine_only_book() -> Vec<u8> {
    let items = [
        ("c1", "text/one.xhtml", XHTML, None),
        ("c2", "text/two.xhtml", XHTML, None),
    ];
    let package = package_xml("Spine Book", &items, &["c1", "c2"], None);
    EpubBuilder::streaming()
        .container("OEBPS/content.opf")
        .file("OEBPS/content.opf", &package)
        .file(
            "OEBPS/text/one.xhtml",
            &chapter_xhtml(Some("The Beginning"), "<p>First.</p>"),
        )
        .file_with(
            "OEBPS/text/two.xhtml",
            &chapter_xhtml(None, "<h2>Second Part</h2><p>Second.</p>"),
            Mode::Stored,
        )
        .build()
}
