//! Bounded per-segment retry with exponential backoff.
//!
//! A segment moves through a small state machine:
//!
//! ```text
//! Pending -> InFlight{1} -> Done
//!                        -> InFlight{2} -> ...   (only if the policy says Retry)
//!                        -> Failed{attempts}
//! ```
//!
//! Each new attempt re-enters the segment fetcher, which resumes from the
//! bytes already appended to the part file.
//!
//! # Example
//!
//! ```
//! use rangefetch_core::fetch::{FailureType, FetchError, RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::with_max_attempts(3);
//! let error = FetchError::http_status("https://example.com/file.iso", 503);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { delay, attempt } => println!("retry #{attempt} in {delay:?}"),
//!     RetryDecision::DoNotRetry { reason } => println!("giving up: {reason}"),
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::FetchError;

/// Default maximum attempts per segment: a single try, no retry.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// Delay before the first retry; doubles for every further attempt.
const FIRST_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on the backoff before jitter.
const BACKOFF_CAP: Duration = Duration::from_secs(32);

/// Jitter is drawn uniformly from `0..=MAX_JITTER_MS` milliseconds.
const MAX_JITTER_MS: u64 = 500;

/// Classification of segment failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry (timeouts, 5xx, dropped
    /// connections, a server that briefly ignored the range).
    Transient,

    /// Failure that won't succeed regardless of retries (4xx, local IO).
    Permanent,

    /// Server rate limiting (HTTP 429).
    RateLimited,

    /// The caller cancelled the fetch.
    Cancelled,
}

/// Decision on whether to retry a failed segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// How many times a segment may be attempted and how long to back off.
///
/// ```text
/// backoff(n) = min(first_delay * 2^(n-1), cap) + jitter(0..=500ms)
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts per segment, counting the first one.
    max_attempts: u32,
    first_delay: Duration,
    cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_max_attempts(DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetryPolicy {
    /// Policy allowing `max_attempts` attempts (at least 1) with the default
    /// backoff of 1 s doubling up to 32 s.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            first_delay: FIRST_RETRY_DELAY,
            cap: BACKOFF_CAP,
        }
    }

    /// Replaces the first retry delay and the backoff cap.
    #[must_use]
    pub fn with_delays(mut self, first_delay: Duration, cap: Duration) -> Self {
        self.first_delay = first_delay;
        self.cap = cap;
        self
    }

    /// Attempts per segment, counting the first one.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides what happens after attempt number `attempt` (1-indexed)
    /// failed with `failure_type`.
    #[instrument(level = "trace", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        let reason = match failure_type {
            FailureType::Permanent => Some("permanent failure".to_string()),
            FailureType::Cancelled => Some("cancelled".to_string()),
            FailureType::Transient | FailureType::RateLimited
                if attempt >= self.max_attempts =>
            {
                Some(format!("max attempts ({}) exhausted", self.max_attempts))
            }
            FailureType::Transient | FailureType::RateLimited => None,
        };

        match reason {
            Some(reason) => {
                debug!(attempt, %reason, "no further attempt");
                RetryDecision::DoNotRetry { reason }
            }
            None => RetryDecision::Retry {
                delay: self.backoff(attempt) + jitter(),
                attempt: attempt + 1,
            },
        }
    }

    /// Backoff after failed attempt `attempt`, without jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.first_delay.saturating_mul(factor).min(self.cap)
    }
}

fn jitter() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(0..=MAX_JITTER_MS))
}

/// Classifies a fetch error into a failure type for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Timeout, Network (non-TLS) | Transient |
/// | HTTP 408, 5xx | Transient |
/// | HTTP 429 | RateLimited |
/// | other HTTP | Permanent |
/// | LengthMismatch, Integrity (short body) | Transient |
/// | Network (TLS), Io, InvalidUrl, MissingPart | Permanent |
/// | Cancelled | Cancelled |
#[must_use]
pub fn classify_error(error: &FetchError) -> FailureType {
    match error {
        FetchError::HttpStatus { status, .. } => classify_http_status(*status),
        FetchError::Timeout { .. }
        | FetchError::LengthMismatch { .. }
        | FetchError::Integrity { .. } => FailureType::Transient,
        FetchError::Network { source, .. } => {
            if is_tls_error(source) {
                FailureType::Permanent
            } else {
                FailureType::Transient
            }
        }
        FetchError::Cancelled { .. } => FailureType::Cancelled,
        FetchError::Io { .. }
        | FetchError::InvalidUrl { .. }
        | FetchError::InvalidSegmentCount { .. }
        | FetchError::MissingContentLength { .. }
        | FetchError::MissingPart { .. }
        | FetchError::AlreadyInFlight { .. }
        | FetchError::Join { .. } => FailureType::Permanent,
    }
}

fn classify_http_status(status: u16) -> FailureType {
    match status {
        408 => FailureType::Transient,
        429 => FailureType::RateLimited,
        500..=599 => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

fn is_tls_error(error: &reqwest::Error) -> bool {
    let error_string = error.to_string().to_lowercase();
    error_string.contains("certificate")
        || error_string.contains("tls")
        || error_string.contains("ssl")
        || error_string.contains("handshake")
}

/// Lifecycle of one segment within a fetch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentState {
    /// Planned, not yet attempted.
    Pending,
    /// An attempt is running (1-indexed).
    InFlight {
        /// Current attempt number.
        attempt: u32,
    },
    /// The part file holds every byte of the segment.
    Done {
        /// Attempts it took.
        attempts: u32,
    },
    /// Gave up; the part file may be short or missing.
    Failed {
        /// Attempts made.
        attempts: u32,
        /// Display form of the last error.
        error: String,
    },
}

impl SegmentState {
    /// Starts the first attempt. Only valid from `Pending`.
    #[must_use]
    pub fn start(self) -> Self {
        match self {
            Self::Pending => Self::InFlight { attempt: 1 },
            other => other,
        }
    }

    /// Records a successful attempt.
    #[must_use]
    pub fn succeed(self) -> Self {
        match self {
            Self::InFlight { attempt } => Self::Done { attempts: attempt },
            other => other,
        }
    }

    /// Records a failed attempt; returns the next state and the delay to
    /// wait before re-entering `InFlight`, if the policy allows a retry.
    #[must_use]
    pub fn fail(self, error: &FetchError, policy: &RetryPolicy) -> (Self, Option<Duration>) {
        let Self::InFlight { attempt } = self else {
            return (self, None);
        };
        match policy.should_retry(classify_error(error), attempt) {
            RetryDecision::Retry {
                delay,
                attempt: next,
            } => (Self::InFlight { attempt: next }, Some(delay)),
            RetryDecision::DoNotRetry { reason } => {
                debug!(attempt, %reason, "not retrying segment");
                (
                    Self::Failed {
                        attempts: attempt,
                        error: error.to_string(),
                    },
                    None,
                )
            }
        }
    }

    /// Attempts started so far.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Pending => 0,
            Self::InFlight { attempt } => *attempt,
            Self::Done { attempts } | Self::Failed { attempts, .. } => *attempts,
        }
    }

    /// Gives up without starting another attempt, e.g. when cancelled
    /// during a backoff. `attempts` is the number actually made.
    #[must_use]
    pub fn abandon(attempts: u32, error: &FetchError) -> Self {
        Self::Failed {
            attempts,
            error: error.to_string(),
        }
    }

    /// True for `Done` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Failed { .. })
    }
}
