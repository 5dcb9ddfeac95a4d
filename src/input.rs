//! Reading newline-delimited URL lists.
//!
//! One URL per line. Surrounding whitespace is trimmed, blank lines and
//! lines starting with `#` are ignored, and anything that is not an absolute
//! `http`/`https` URL is reported as skipped rather than failing the list.
//!
//! # Example
//!
//! ```
//! use rangefetch_core::input::parse_input_list;
//!
//! let list = parse_input_list("# mirrors\nhttps://example.com/a.iso\n\nnot a url\n");
//! assert_eq!(list.urls, vec!["https://example.com/a.iso"]);
//! assert_eq!(list.skipped_count(), 1);
//! ```

use std::fmt;

use tracing::{debug, warn};
use url::Url;

/// URLs read from an input list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InputList {
    /// Accepted URLs, in input order
    pub urls: Vec<String>,
    /// Lines that were not valid URLs
    pub skipped: Vec<String>,
}

impl InputList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an accepted URL.
    pub fn add_url(&mut self, url: impl Into<String>) {
        self.urls.push(url.into());
    }

    /// Adds a rejected line.
    pub fn add_skipped(&mut self, line: impl Into<String>) {
        self.skipped.push(line.into());
    }

    /// Returns true if no URLs were accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Returns count of accepted URLs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Returns count of rejected lines.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Appends the URLs and skipped lines of `other`.
    pub fn extend(&mut self, other: InputList) {
        self.urls.extend(other.urls);
        self.skipped.extend(other.skipped);
    }
}

impl fmt::Display for InputList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} URLs ({} skipped)",
            self.urls.len(),
            self.skipped.len()
        )
    }
}

/// Parses newline-delimited `text` into an [`InputList`].
#[must_use]
pub fn parse_input_list(text: &str) -> InputList {
    let mut list = InputList::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if is_fetchable_url(line) {
            list.add_url(line);
        } else {
            warn!(line, "skipping invalid URL");
            list.add_skipped(line);
        }
    }

    debug!(urls = list.len(), skipped = list.skipped_count(), "input list parsed");
    list
}

/// Parses each argument as one line of an input list.
#[must_use]
pub fn parse_input_args<S: AsRef<str>>(args: &[S]) -> InputList {
    let mut list = InputList::new();
    for arg in args {
        list.extend(parse_input_list(arg.as_ref()));
    }
    list
}

fn is_fetchable_url(line: &str) -> bool {
    Url::parse(line)
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}
