//! HTTP client wrapper shared by every segment of every resource.
//!
//! `HttpClient` is cheap to clone (the underlying `reqwest::Client` is an
//! `Arc`), so one instance is built at startup and handed to all tasks to
//! reuse pooled connections.

use std::time::Duration;

use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, RANGE};
use reqwest::{Client, Response};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::resource::accepts_ranges;
use super::{FetchError, Resource};

/// HTTP client for probing resources and fetching byte ranges.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes without receiving any bytes
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// The read timeout bounds the silence between two reads, not the whole
    /// request, so a large segment may stream for as long as bytes keep
    /// arriving.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend or system proxy
    /// configuration cannot be loaded.
    pub fn with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .read_timeout(Duration::from_secs(read_timeout_secs))
            .user_agent(default_user_agent())
            .build()?;
        Ok(Self { client })
    }

    /// Issues the header-only capability probe for `url`.
    ///
    /// Reads `Content-Length` (required) and `Accept-Ranges` (absent or
    /// `none` means no range support).
    ///
    /// # Errors
    ///
    /// - [`FetchError::Network`] / [`FetchError::Timeout`] on transport failure
    /// - [`FetchError::HttpStatus`] on a non-success status
    /// - [`FetchError::MissingContentLength`] if no usable length is declared
    #[instrument(skip(self), fields(url = %url))]
    pub async fn probe(&self, url: &Url) -> Result<Resource, FetchError> {
        let response = self
            .client
            .head(url.as_str())
            .send()
            .await
            .map_err(|e| FetchError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url.as_str(), status.as_u16()));
        }

        // HEAD responses carry no body, so read the header rather than
        // `Response::content_length`.
        let total_length = declared_length(&response)
            .ok_or_else(|| FetchError::missing_content_length(url.as_str()))?;
        let ranges = accepts_ranges(
            response
                .headers()
                .get(ACCEPT_RANGES)
                .and_then(|v| v.to_str().ok()),
        );

        debug!(total_length, accepts_ranges = ranges, "probe complete");
        Ok(Resource::new(url, total_length, ranges))
    }

    /// Sends a GET for the inclusive byte range `start..=end` of `url`.
    ///
    /// The response is returned unread so the caller can validate its
    /// declared length and stream the body.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Network`] / [`FetchError::Timeout`] on transport failure
    /// - [`FetchError::HttpStatus`] on a non-success status
    #[instrument(level = "debug", skip(self))]
    pub async fn get_range(&self, url: &str, start: u64, end: u64) -> Result<Response, FetchError> {
        let response = self
            .client
            .get(url)
            .header(RANGE, range_header(start, end))
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Formats an inclusive `Range` header value.
#[must_use]
pub fn range_header(start: u64, end: u64) -> String {
    format!("bytes={start}-{end}")
}

/// Parses the `Content-Length` header of a response.
#[must_use]
pub fn declared_length(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Default User-Agent for fetch requests (identifies the tool).
fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("rangefetch/{version} (segmented-fetcher)")
}
