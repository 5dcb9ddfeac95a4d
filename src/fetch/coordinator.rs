//! Orchestration of a single resource fetch and of batches of resources.
//!
//! # Overview
//!
//! For each resource the coordinator:
//! 1. probes the server for length and range support
//! 2. claims the resource's staging directory in the [`InFlightRegistry`]
//! 3. plans segments (a single one without range support)
//! 4. creates the staging directory and assigns part-file paths
//! 5. spawns one task per segment on the shared [`HttpClient`] and waits for
//!    all of them
//! 6. merges the part files in index order
//!
//! # Example
//!
//! ```no_run
//! use rangefetch_core::fetch::{FetchConfig, FetchCoordinator, HttpClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = FetchCoordinator::new(HttpClient::new(), FetchConfig::new("./downloads"));
//! let report = coordinator
//!     .fetch_resource("https://example.com/file.iso", 8)
//!     .await?;
//! println!("fetched {} bytes to {}", report.merge.bytes, report.merge.output.display());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::constants::MAX_SEGMENT_COUNT;
use super::merge::{MergeReport, merge};
use super::planner::plan_for;
use super::registry::InFlightRegistry;
use super::retry::{RetryPolicy, SegmentState};
use super::segment::{SegmentReport, run_segment};
use super::store::{assign_paths, ensure_staging_dir, staging_dir};
use super::{FetchError, HttpClient, Resource, Segment};

/// Settings shared by every fetch a coordinator runs.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Directory the merged output files are written to.
    pub output_dir: PathBuf,
    /// Directory the per-resource staging directories are created under.
    pub staging_root: PathBuf,
    /// Per-segment retry policy.
    pub retry_policy: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

impl FetchConfig {
    /// Creates a config writing outputs and staging directories to `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            staging_root: output_dir.clone(),
            output_dir,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Sets the directory staging directories are created under.
    #[must_use]
    pub fn with_staging_root(mut self, staging_root: impl Into<PathBuf>) -> Self {
        self.staging_root = staging_root.into();
        self
    }

    /// Sets the per-segment retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }
}

/// Everything known about a successfully fetched resource.
#[derive(Debug, Clone)]
pub struct FetchReport {
    /// The probed resource.
    pub resource: Resource,
    /// Per-segment reports, in index order.
    pub segments: Vec<SegmentReport>,
    /// Merge summary.
    pub merge: MergeReport,
}

/// Outcome counts of a batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchStats {
    /// Resources whose output file now exists.
    pub completed: usize,
    /// Resources that failed to probe, fetch or merge.
    pub failed: usize,
    /// Resources rejected because a fetch into the same staging directory
    /// was already in flight.
    pub skipped: usize,
}

impl FetchStats {
    /// Total resources handled.
    #[must_use]
    pub fn total(&self) -> usize {
        self.completed + self.failed + self.skipped
    }
}

/// Runs segmented fetches against one shared client.
///
/// Cloning is cheap and clones share the client, the in-flight registry and
/// the cancellation token.
///
/// # Concurrency Model
///
/// - One Tokio task per resource in [`fetch_all`](Self::fetch_all)
/// - One Tokio task per segment within a resource
/// - All segment tasks are awaited before merging; completion order does
///   not matter, merge order is by segment index
#[derive(Debug, Clone)]
pub struct FetchCoordinator {
    client: HttpClient,
    config: FetchConfig,
    registry: Arc<InFlightRegistry>,
    cancel: CancellationToken,
}

impl FetchCoordinator {
    /// Creates a coordinator.
    #[must_use]
    #[instrument(level = "debug", skip(client))]
    pub fn new(client: HttpClient, config: FetchConfig) -> Self {
        debug!(
            max_attempts = config.retry_policy.max_attempts(),
            "creating fetch coordinator"
        );
        Self {
            client,
            config,
            registry: Arc::new(InFlightRegistry::new()),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the cancellation token; cancelling it aborts every fetch.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The token that cancels every fetch of this coordinator.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The coordinator's configuration.
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// The registry of resources currently in flight.
    #[must_use]
    pub fn registry(&self) -> &Arc<InFlightRegistry> {
        &self.registry
    }

    /// Fetches one resource split into (up to) `segment_count` segments.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] if `url` is not an absolute http(s) URL
    /// - [`FetchError::InvalidSegmentCount`] if `segment_count` is outside
    ///   `1..=256`
    /// - [`FetchError::AlreadyInFlight`] if another fetch is writing into the
    ///   same staging directory (same file name, possibly another URL)
    /// - probe errors ([`FetchError::HttpStatus`], [`FetchError::Network`],
    ///   [`FetchError::MissingContentLength`], ...): nothing is written
    /// - [`FetchError::Io`] if the staging directory cannot be created
    /// - [`FetchError::Cancelled`] if cancelled; part files are kept
    /// - merge errors ([`FetchError::MissingPart`], [`FetchError::Integrity`]):
    ///   no output file, staging directory kept
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_resource(
        &self,
        url: &str,
        segment_count: u64,
    ) -> Result<FetchReport, FetchError> {
        let parsed = parse_fetch_url(url)?;
        validate_segment_count(segment_count)?;

        info!("probing resource");
        let resource = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(FetchError::cancelled(parsed.as_str())),
            result = self.client.probe(&parsed) => result?,
        };

        // Part files and output are named after the file name, not the URL.
        let staging = staging_dir(&self.config.staging_root, resource.file_name());
        let _claim = self
            .registry
            .claim(&claim_key(&staging))
            .ok_or_else(|| FetchError::already_in_flight(resource.url()))?;

        if !resource.accepts_ranges() && segment_count > 1 {
            warn!("server does not accept ranges, using a single segment");
        }
        let segments = plan_for(&resource, segment_count);
        info!(
            total_length = resource.total_length(),
            accepts_ranges = resource.accepts_ranges(),
            segments = segments.len(),
            file = resource.file_name(),
            "resource planned"
        );

        let (dir_result, paths) = tokio::join!(ensure_staging_dir(&staging), async {
            assign_paths(&staging, resource.file_name(), segments.len())
        });
        dir_result?;

        let reports = self
            .fetch_segments(resource.url(), &segments, &paths)
            .await;
        let failed = reports.iter().filter(|r| !r.is_done()).count();
        if failed > 0 {
            warn!(failed, total = reports.len(), "some segments failed");
        }

        if self.cancel.is_cancelled() {
            info!(staging = %staging.display(), "fetch cancelled, keeping segment files");
            return Err(FetchError::cancelled(resource.url()));
        }

        let output = output_path(&self.config.output_dir, resource.file_name());
        let merge = merge(&segments, &paths, &staging, &output).await?;

        info!(bytes = merge.bytes, path = %merge.output.display(), "resource fetched");
        Ok(FetchReport {
            resource,
            segments: reports,
            merge,
        })
    }

    /// Fetches every URL concurrently, each split into `segment_count`
    /// segments.
    ///
    /// Individual failures are logged and counted, never returned.
    #[instrument(skip(self, urls), fields(count = urls.len()))]
    pub async fn fetch_all(&self, urls: Vec<String>, segment_count: u64) -> FetchStats {
        let handles: Vec<_> = urls
            .into_iter()
            .map(|url| {
                let coordinator = self.clone();
                tokio::spawn(async move {
                    let result = coordinator.fetch_resource(&url, segment_count).await;
                    (url, result)
                })
            })
            .collect();

        let mut stats = FetchStats::default();
        for handle in handles {
            match handle.await {
                Ok((_, Ok(_))) => stats.completed += 1,
                Ok((url, Err(FetchError::AlreadyInFlight { .. }))) => {
                    warn!(%url, "duplicate resource skipped");
                    stats.skipped += 1;
                }
                Ok((url, Err(error))) => {
                    warn!(%url, %error, "resource failed");
                    stats.failed += 1;
                }
                Err(error) => {
                    warn!(%error, "resource task panicked");
                    stats.failed += 1;
                }
            }
        }

        info!(
            completed = stats.completed,
            failed = stats.failed,
            skipped = stats.skipped,
            "batch complete"
        );
        stats
    }

    /// Spawns one task per segment and waits for all of them.
    async fn fetch_segments(
        &self,
        url: &str,
        segments: &[Segment],
        paths: &[PathBuf],
    ) -> Vec<SegmentReport> {
        let handles: Vec<_> = segments
            .iter()
            .zip(paths)
            .map(|(segment, path)| {
                let client = self.client.clone();
                let url = url.to_string();
                let segment = *segment;
                let path = path.clone();
                let policy = self.config.retry_policy.clone();
                let cancel = self.cancel.child_token();
                tokio::spawn(async move {
                    run_segment(&client, &url, segment, &path, &policy, &cancel).await
                })
            })
            .collect();

        debug!(task_count = handles.len(), "waiting for segments");

        let mut reports = Vec::with_capacity(handles.len());
        for (index, handle) in handles.into_iter().enumerate() {
            let report = handle.await.unwrap_or_else(|source| {
                let error = FetchError::Join { index, source };
                warn!(%error, "segment task panicked");
                SegmentReport {
                    index,
                    state: SegmentState::Failed {
                        attempts: 0,
                        error: error.to_string(),
                    },
                    outcome: None,
                }
            });
            reports.push(report);
        }
        reports
    }
}

fn validate_segment_count(value: u64) -> Result<(), FetchError> {
    if (1..=MAX_SEGMENT_COUNT).contains(&value) {
        Ok(())
    } else {
        Err(FetchError::invalid_segment_count(value))
    }
}

/// Registry key for a staging directory.
fn claim_key(staging: &Path) -> String {
    staging.to_string_lossy().into_owned()
}

/// Parses an absolute http(s) URL.
fn parse_fetch_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url.trim()).map_err(|_| FetchError::invalid_url(url))?;
    if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() {
        Ok(parsed)
    } else {
        Err(FetchError::invalid_url(url))
    }
}

/// Output path a resource named `file_name` is merged into.
#[must_use]
pub fn output_path(output_dir: &Path, file_name: &str) -> PathBuf {
    output_dir.join(file_name)
}
