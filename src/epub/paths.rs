//! Archive path helpers.

/// Directory part of an archive path (`OEBPS/content.opf` -> `OEBPS`).
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Split `file#fragment`. An empty fragment counts as none.
pub fn split_fragment(href: &str) -> (&str, Option<&str>) {
    match href.split_once('#') {
        Some((file, fragment)) if !fragment.is_empty() => (file, Some(fragment)),
        Some((file, _)) => (file, None),
        None => (href, None),
    }
}

/// Resolve `href` (without fragment) against the directory `base_dir`,
/// collapsing `.` and `..` segments. A leading `/` is archive-absolute.
pub fn resolve_href(base_dir: &str, href: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    let relative = match href.strip_prefix('/') {
        Some(absolute) => absolute,
        None => {
            segments.extend(base_dir.split('/').filter(|s| !s.is_empty()));
            href
        }
    };

    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Whether an href points outside the book.
pub fn is_external(href: &str) -> bool {
    href.contains("://") || href.starts_with("mailto:")
}
