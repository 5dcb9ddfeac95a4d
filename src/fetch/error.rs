//! Error types for the fetch module.
//!
//! Every variant carries the URL or path it concerns, so a log line built
//! from the `Display` output is enough to locate the failing segment.

use std::path::PathBuf;

use thiserror::Error;

use super::constants::MAX_SEGMENT_COUNT;

/// Errors that can occur while probing, fetching, or merging a resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error (create, append, read, rename).
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or not absolute.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// A segment count outside the supported range was requested.
    #[error("invalid segment count {value}: must be between 1 and {MAX_SEGMENT_COUNT}")]
    InvalidSegmentCount {
        /// The rejected count.
        value: u64,
    },

    /// The capability probe did not return a usable `Content-Length`.
    #[error("missing or unparsable Content-Length probing {url}")]
    MissingContentLength {
        /// The probed URL.
        url: String,
    },

    /// A range response declared a length other than the requested span.
    #[error("range bytes={start}-{end} of {url}: expected {expected} bytes, server declared {declared:?}")]
    LengthMismatch {
        /// The URL of the resource.
        url: String,
        /// First byte requested.
        start: u64,
        /// Last byte requested (inclusive).
        end: u64,
        /// Span length that was requested.
        expected: u64,
        /// Length declared by the server, if any.
        declared: Option<u64>,
    },

    /// A part file holds a different number of bytes than its segment.
    #[error("integrity check failed for {path}: expected {expected_bytes} bytes, got {actual_bytes}")]
    Integrity {
        /// Part file that failed verification.
        path: PathBuf,
        /// Expected size in bytes.
        expected_bytes: u64,
        /// Actual size in bytes.
        actual_bytes: u64,
    },

    /// A segment's part file does not exist at merge time.
    #[error("segment {index} part file missing: {path}")]
    MissingPart {
        /// Segment index.
        index: usize,
        /// Expected part file path.
        path: PathBuf,
    },

    /// The fetch was cancelled before it could finish.
    #[error("fetch of {url} cancelled")]
    Cancelled {
        /// The URL whose fetch was cancelled.
        url: String,
    },

    /// Another fetch into the same staging directory is already running.
    #[error("a fetch of {url} is already in flight")]
    AlreadyInFlight {
        /// The duplicate URL.
        url: String,
    },

    /// A segment task panicked or was aborted.
    #[error("segment {index} task failed: {source}")]
    Join {
        /// Segment index.
        index: usize,
        /// The join error.
        #[source]
        source: tokio::task::JoinError,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error, promoting timeouts.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::Timeout { url: url.into() };
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an invalid segment count error.
    pub fn invalid_segment_count(value: u64) -> Self {
        Self::InvalidSegmentCount { value }
    }

    /// Creates a missing content length error.
    pub fn missing_content_length(url: impl Into<String>) -> Self {
        Self::MissingContentLength { url: url.into() }
    }

    /// Creates a range length mismatch error.
    pub fn length_mismatch(
        url: impl Into<String>,
        start: u64,
        end: u64,
        declared: Option<u64>,
    ) -> Self {
        Self::LengthMismatch {
            url: url.into(),
            start,
            end,
            expected: end - start + 1,
            declared,
        }
    }

    /// Creates an integrity mismatch error.
    pub fn integrity(path: impl Into<PathBuf>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::Integrity {
            path: path.into(),
            expected_bytes,
            actual_bytes,
        }
    }

    /// Creates a missing part file error.
    pub fn missing_part(index: usize, path: impl Into<PathBuf>) -> Self {
        Self::MissingPart {
            index,
            path: path.into(),
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Creates a duplicate in-flight fetch error.
    pub fn already_in_flight(url: impl Into<String>) -> Self {
        Self::AlreadyInFlight { url: url.into() }
    }

    /// Returns true if this error is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: the variants need a url
// or path the source errors do not carry. Use the constructors above.

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_timeout_display() {
        let error = FetchError::timeout("https://example.com/file.iso");
        assert!(error.to_string().contains("timeout"));
        assert!(error.to_string().contains("https://example.com/file.iso"));
    }

    #[test]
    fn test_fetch_error_http_status_display() {
        let error = FetchError::http_status("https://example.com/file.iso", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(
            msg.contains("https://example.com/file.iso"),
            "Expected URL in: {msg}"
        );
    }

    #[test]
    fn test_fetch_error_io_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = FetchError::io(PathBuf::from("/tmp/tmp_file.iso/file.iso_0_3.part"), io_error);
        let msg = error.to_string();
        assert!(msg.contains("file.iso_0_3.part"), "Expected path in: {msg}");
    }

    #[test]
    fn test_fetch_error_length_mismatch_computes_expected_span() {
        let error = FetchError::length_mismatch("https://example.com/a.bin", 33, 65, Some(10));
        match &error {
            FetchError::LengthMismatch {
                expected, declared, ..
            } => {
                assert_eq!(*expected, 33);
                assert_eq!(*declared, Some(10));
            }
            other => panic!("Expected LengthMismatch, got: {other:?}"),
        }
        let msg = error.to_string();
        assert!(msg.contains("bytes=33-65"), "Expected range in: {msg}");
    }

    #[test]
    fn test_fetch_error_length_mismatch_missing_header() {
        let error = FetchError::length_mismatch("https://example.com/a.bin", 0, 9, None);
        assert!(error.to_string().contains("None"));
    }

    #[test]
    fn test_fetch_error_missing_part_display() {
        let error = FetchError::missing_part(1, "/tmp/tmp_a.bin/a.bin_1_3.part");
        let msg = error.to_string();
        assert!(msg.contains("segment 1"), "Expected index in: {msg}");
        assert!(msg.contains("a.bin_1_3.part"), "Expected path in: {msg}");
    }

    #[test]
    fn test_fetch_error_invalid_segment_count_display() {
        let msg = FetchError::invalid_segment_count(0).to_string();
        assert!(msg.contains("invalid segment count 0"), "got: {msg}");
        assert!(msg.contains("256"), "got: {msg}");
    }

    #[test]
    fn test_fetch_error_is_cancelled() {
        assert!(FetchError::cancelled("https://example.com/a").is_cancelled());
        assert!(!FetchError::timeout("https://example.com/a").is_cancelled());
    }

    #[test]
    fn test_fetch_error_already_in_flight_display() {
        let error = FetchError::already_in_flight("https://example.com/a.bin");
        assert!(error.to_string().contains("already in flight"));
    }
}
