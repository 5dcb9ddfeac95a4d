//! Rangefetch Core Library
//!
//! This library fetches remote files over HTTP by splitting them into
//! byte-range segments, fetching the segments in parallel and merging them
//! back into a single file.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`fetch`] - Probing, range planning, segment fetching and merging
//! - [`input`] - Newline-delimited URL list parsing

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod fetch;
pub mod input;

// Re-export commonly used types
pub use fetch::{
    DEFAULT_MAX_ATTEMPTS, FailureType, FetchConfig, FetchCoordinator, FetchError, FetchReport,
    FetchStats, HttpClient, RetryDecision, RetryPolicy, Segment, classify_error, plan,
};
pub use input::{InputList, parse_input_list};
