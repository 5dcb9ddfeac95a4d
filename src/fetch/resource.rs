//! A remote resource as described by its capability probe.

use std::path::{Component, Path};

use url::Url;

/// A resource to be fetched, as reported by the capability probe.
///
/// Created once per fetch and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    url: String,
    total_length: u64,
    accepts_ranges: bool,
    file_name: String,
}

impl Resource {
    /// Creates a resource from a parsed URL and probe results.
    #[must_use]
    pub fn new(url: &Url, total_length: u64, accepts_ranges: bool) -> Self {
        Self {
            url: url.to_string(),
            total_length,
            accepts_ranges,
            file_name: file_name_from_url(url),
        }
    }

    /// The source URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Total byte length advertised by the server.
    #[must_use]
    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    /// Whether the server advertised byte-range support.
    #[must_use]
    pub fn accepts_ranges(&self) -> bool {
        self.accepts_ranges
    }

    /// Output file name derived from the URL.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Segment count to actually use for this resource.
    ///
    /// Without range support only a single whole-resource fetch is correct,
    /// whatever the caller asked for.
    #[must_use]
    pub fn effective_segment_count(&self, requested: u64) -> u64 {
        if self.accepts_ranges {
            requested.max(1)
        } else {
            1
        }
    }
}

/// Interprets an `Accept-Ranges` header value.
///
/// Absence or `none` means no range support.
#[must_use]
pub fn accepts_ranges(header: Option<&str>) -> bool {
    match header.map(str::trim) {
        None | Some("") => false,
        Some(value) => !value.eq_ignore_ascii_case("none"),
    }
}

/// Derives the output file name from the last non-empty URL path segment.
///
/// Falls back to `download_<timestamp>.bin` when the path has no segment.
#[must_use]
pub fn file_name_from_url(url: &Url) -> String {
    if let Some(segments) = url.path_segments()
        && let Some(last) = segments.filter(|s| !s.is_empty()).next_back()
    {
        return sanitize_file_name(last);
    }

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("download_{timestamp}.bin")
}

/// Replaces characters that are invalid in file names.
///
/// Names that would resolve to `.` or `..` have their dots replaced too, so
/// the result is always a single plain path component.
pub(crate) fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        return "_".to_string();
    }

    let is_plain = Path::new(&sanitized)
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if is_plain {
        sanitized
    } else {
        sanitized.replace('.', "_")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_file_name_from_url_uses_last_segment() {
        assert_eq!(
            file_name_from_url(&url("https://example.com/isos/debian.iso")),
            "debian.iso"
        );
    }

    #[test]
    fn test_file_name_from_url_ignores_query() {
        assert_eq!(
            file_name_from_url(&url("https://example.com/a/archive.tar.gz?token=abc")),
            "archive.tar.gz"
        );
    }

    #[test]
    fn test_file_name_from_url_trailing_slash_uses_directory() {
        assert_eq!(
            file_name_from_url(&url("https://example.com/releases/")),
            "releases"
        );
    }

    #[test]
    fn test_file_name_from_url_root_falls_back() {
        let name = file_name_from_url(&url("https://example.com/"));
        assert!(name.starts_with("download_"), "unexpected fallback: {name}");
        assert!(name.ends_with(".bin"));
    }

    #[test]
    fn test_sanitize_file_name_replaces_invalid_chars() {
        assert_eq!(sanitize_file_name("a:b*c.bin"), "a_b_c.bin");
        assert_eq!(sanitize_file_name("a\\b"), "a_b");
    }

    #[test]
    fn test_sanitize_file_name_neutralises_dot_segments() {
        assert_eq!(sanitize_file_name(".."), "__");
        assert_eq!(sanitize_file_name("."), "_");
    }

    #[test]
    fn test_accepts_ranges_header_values() {
        assert!(accepts_ranges(Some("bytes")));
        assert!(accepts_ranges(Some("Bytes")));
        assert!(!accepts_ranges(Some("none")));
        assert!(!accepts_ranges(Some("NONE")));
        assert!(!accepts_ranges(Some("")));
        assert!(!accepts_ranges(None));
    }

    #[test]
    fn test_effective_segment_count_downgrades_without_ranges() {
        let no_ranges = Resource::new(&url("https://example.com/a.bin"), 100, false);
        assert_eq!(no_ranges.effective_segment_count(30), 1);

        let ranges = Resource::new(&url("https://example.com/a.bin"), 100, true);
        assert_eq!(ranges.effective_segment_count(30), 30);
        assert_eq!(ranges.effective_segment_count(0), 1);
    }

    #[test]
    fn test_resource_accessors() {
        let resource = Resource::new(&url("https://example.com/x/file.zip"), 42, true);
        assert_eq!(resource.url(), "https://example.com/x/file.zip");
        assert_eq!(resource.total_length(), 42);
        assert!(resource.accepts_ranges());
        assert_eq!(resource.file_name(), "file.zip");
    }
}
