//! Parallel segmented HTTP fetching.
//!
//! A remote resource is probed once, split into contiguous byte ranges,
//! fetched concurrently into per-segment part files and concatenated in
//! index order into the output file.
//!
//! # Features
//!
//! - Header-only probe for length and range support
//! - Even split planning with the remainder on the last segment
//! - Append-only part files that resume from their existing size
//! - Strict per-response length validation
//! - Atomic merge (`<output>.partial` renamed on success)
//! - Optional per-segment retry with exponential backoff
//! - Cancellation at every await point
//!
//! # Example
//!
//! ```no_run
//! use rangefetch_core::fetch::{FetchConfig, FetchCoordinator, HttpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = FetchCoordinator::new(HttpClient::new(), FetchConfig::new("."));
//! let stats = coordinator
//!     .fetch_all(vec!["https://example.com/file.iso".to_string()], 8)
//!     .await;
//! println!("{} completed, {} failed", stats.completed, stats.failed);
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod coordinator;
mod error;
mod merge;
mod planner;
mod registry;
mod resource;
mod retry;
mod segment;
mod store;

pub use client::{HttpClient, declared_length, range_header};
pub use coordinator::{
    FetchConfig, FetchCoordinator, FetchReport, FetchStats, output_path,
};
pub use error::FetchError;
pub use merge::{MergeReport, merge, partial_output_path};
pub use planner::{Segment, plan, plan_for};
pub use registry::{ClaimGuard, InFlightRegistry};
pub use resource::{Resource, accepts_ranges, file_name_from_url};
pub use retry::{
    DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, SegmentState, classify_error,
};
pub use segment::{SegmentOutcome, SegmentReport, fetch_segment, run_segment};
pub use store::{assign_path, assign_paths, ensure_staging_dir, staging_dir};
