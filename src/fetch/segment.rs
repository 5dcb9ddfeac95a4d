//! Fetching one segment into its part file.
//!
//! The part file is append-only: bytes already on disk from an earlier
//! attempt or run count toward the segment, and the range request starts
//! after them. The end of the range never moves.

use std::io::ErrorKind;
use std::path::Path;

use futures_util::StreamExt;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::client::declared_length;
use super::retry::{RetryPolicy, SegmentState};
use super::{FetchError, HttpClient, Segment};

/// Result of a successful segment fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentOutcome {
    /// The part file already held every byte; no request was sent.
    AlreadyComplete,
    /// Bytes were fetched and appended.
    Fetched {
        /// Bytes already on disk before this attempt.
        resumed_from: u64,
        /// Bytes appended by this attempt.
        bytes: u64,
    },
}

/// Final report for one segment after its retry loop ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentReport {
    /// Segment index.
    pub index: usize,
    /// Terminal state (`Done` or `Failed`).
    pub state: SegmentState,
    /// Outcome of the successful attempt, if any.
    pub outcome: Option<SegmentOutcome>,
}

impl SegmentReport {
    /// True if the segment's part file is complete.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self.state, SegmentState::Done { .. })
    }
}

/// Fetches `segment` of `url` into `path`, resuming from existing bytes.
///
/// # Errors
///
/// - [`FetchError::LengthMismatch`] if the response does not declare exactly
///   the requested span
/// - [`FetchError::Integrity`] if the body ended short of the declared length
/// - [`FetchError::Network`], [`FetchError::Timeout`], [`FetchError::HttpStatus`]
///   from the request
/// - [`FetchError::Io`] if the part file cannot be inspected or appended
/// - [`FetchError::Cancelled`] if `cancel` fires first; appended bytes stay
#[instrument(skip(client, cancel), fields(segment = %segment, path = %path.display()))]
pub async fn fetch_segment(
    client: &HttpClient,
    url: &str,
    segment: &Segment,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<SegmentOutcome, FetchError> {
    let existing = existing_len(path).await?;

    let Some(end) = segment.end() else {
        // Empty segment: make sure the merger finds a (zero-length) part file.
        open_append(path).await?;
        return Ok(SegmentOutcome::AlreadyComplete);
    };

    let effective_start = segment.start() + existing;
    if effective_start > end {
        debug!(existing, "segment already fetched");
        return Ok(SegmentOutcome::AlreadyComplete);
    }
    if existing > 0 {
        info!(existing, effective_start, "resuming segment");
    }

    if cancel.is_cancelled() {
        return Err(FetchError::cancelled(url));
    }

    let response = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(FetchError::cancelled(url)),
        result = client.get_range(url, effective_start, end) => result?,
    };

    let expected = end - effective_start + 1;
    let declared = declared_length(&response);
    if declared != Some(expected) {
        warn!(expected, ?declared, "content length mismatch");
        return Err(FetchError::length_mismatch(
            url,
            effective_start,
            end,
            declared,
        ));
    }

    let file = open_append(path).await?;
    let bytes = stream_to_file(file, response, url, path, cancel).await?;
    if bytes != expected {
        return Err(FetchError::integrity(path, expected, bytes));
    }

    debug!(bytes, "segment fetched");
    Ok(SegmentOutcome::Fetched {
        resumed_from: existing,
        bytes,
    })
}

/// Drives one segment through its retry state machine.
///
/// Never returns an error: failures end in [`SegmentState::Failed`] and are
/// surfaced later by the merger as a missing or short part file.
#[instrument(skip(client, policy, cancel), fields(segment = %segment))]
pub async fn run_segment(
    client: &HttpClient,
    url: &str,
    segment: Segment,
    path: &Path,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> SegmentReport {
    let mut state = SegmentState::Pending.start();

    loop {
        match fetch_segment(client, url, &segment, path, cancel).await {
            Ok(outcome) => {
                return SegmentReport {
                    index: segment.index(),
                    state: state.succeed(),
                    outcome: Some(outcome),
                };
            }
            Err(error) => {
                warn!(%error, ?state, "segment attempt failed");
                let attempts_made = state.attempts();
                let (next, delay) = state.fail(&error, policy);
                state = next;

                let Some(delay) = delay else {
                    return SegmentReport {
                        index: segment.index(),
                        state,
                        outcome: None,
                    };
                };

                debug!(delay_ms = delay.as_millis(), ?state, "retrying segment");
                tokio::select! {
                    () = cancel.cancelled() => {
                        return SegmentReport {
                            index: segment.index(),
                            state: SegmentState::abandon(
                                attempts_made,
                                &FetchError::cancelled(url),
                            ),
                            outcome: None,
                        };
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

/// Size of the part file, or 0 if it does not exist yet.
async fn existing_len(path: &Path) -> Result<u64, FetchError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(FetchError::io(path, e)),
    }
}

async fn open_append(path: &Path) -> Result<File, FetchError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| FetchError::io(path, e))
}

/// Streams the response body onto the end of `file`, returning bytes written.
///
/// Whatever was received before an error or cancellation is flushed, so the
/// next attempt resumes after it.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<u64, FetchError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    let result = loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => break Err(FetchError::cancelled(url)),
            next = stream.next() => next,
        };
        let Some(chunk) = next else {
            break Ok(());
        };
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => break Err(FetchError::network(url, e)),
        };
        if let Err(e) = writer.write_all(&chunk).await {
            break Err(FetchError::io(path, e));
        }
        bytes_written += chunk.len() as u64;
    };

    let flushed = writer.flush().await.map_err(|e| FetchError::io(path, e));
    result?;
    flushed?;
    Ok(bytes_written)
}
