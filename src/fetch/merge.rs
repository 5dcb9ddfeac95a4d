//! Ordered concatenation of part files into the output file.
//!
//! The merge writes into `<output>.partial` and renames it onto the output
//! path only once every part has been copied, so a file at the output path
//! is always complete. On failure the `.partial` file and the whole staging
//! directory stay on disk for inspection or a resumed run.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{info, instrument, warn};

use super::constants::MERGE_SUFFIX;
use super::{FetchError, Segment};

/// Summary of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Final output path.
    pub output: PathBuf,
    /// Bytes written to the output.
    pub bytes: u64,
    /// Whether the staging directory was removed.
    pub staging_removed: bool,
}

/// Path the merge writes to before the final rename.
#[must_use]
pub fn partial_output_path(output_path: &Path) -> PathBuf {
    let mut name = output_path.as_os_str().to_os_string();
    name.push(MERGE_SUFFIX);
    PathBuf::from(name)
}

/// Concatenates the part files of `segments`, in index order, into
/// `output_path`, then removes `staging_dir`.
///
/// `paths[i]` must be the part file of the segment with index `i`.
///
/// # Errors
///
/// - [`FetchError::MissingPart`] if a part file does not exist
/// - [`FetchError::Integrity`] if a part file's size differs from its segment
/// - [`FetchError::Io`] on any read, write or rename failure
///
/// A failure to remove the staging directory afterwards is only logged.
#[instrument(skip(segments, paths), fields(segments = segments.len(), output = %output_path.display()))]
pub async fn merge(
    segments: &[Segment],
    paths: &[PathBuf],
    staging_dir: &Path,
    output_path: &Path,
) -> Result<MergeReport, FetchError> {
    let partial_path = partial_output_path(output_path);
    let file = File::create(&partial_path)
        .await
        .map_err(|e| FetchError::io(&partial_path, e))?;
    let mut writer = BufWriter::new(file);

    info!("merging segments");

    let mut ordered: Vec<&Segment> = segments.iter().collect();
    ordered.sort_by_key(|segment| segment.index());

    let mut bytes = 0u64;
    for segment in ordered {
        let part_path = paths
            .get(segment.index())
            .ok_or_else(|| FetchError::missing_part(segment.index(), staging_dir))?;
        bytes += append_part(&mut writer, segment, part_path).await.inspect_err(|error| {
            warn!(%error, index = segment.index(), "merge failed, keeping segment files");
        })?;
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::io(&partial_path, e))?;
    drop(writer);

    tokio::fs::rename(&partial_path, output_path)
        .await
        .map_err(|e| FetchError::io(output_path, e))?;

    let staging_removed = match tokio::fs::remove_dir_all(staging_dir).await {
        Ok(()) => true,
        Err(error) => {
            warn!(%error, staging = %staging_dir.display(), "could not remove staging directory");
            false
        }
    };

    info!(bytes, staging_removed, "merge complete");
    Ok(MergeReport {
        output: output_path.to_path_buf(),
        bytes,
        staging_removed,
    })
}

/// Copies one complete part file onto the end of `writer`.
async fn append_part(
    writer: &mut BufWriter<File>,
    segment: &Segment,
    part_path: &Path,
) -> Result<u64, FetchError> {
    let mut part = match File::open(part_path).await {
        Ok(part) => part,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(FetchError::missing_part(segment.index(), part_path));
        }
        Err(e) => return Err(FetchError::io(part_path, e)),
    };

    let actual = part
        .metadata()
        .await
        .map_err(|e| FetchError::io(part_path, e))?
        .len();
    if actual != segment.len() {
        return Err(FetchError::integrity(part_path, segment.len(), actual));
    }

    tokio::io::copy(&mut part, writer)
        .await
        .map_err(|e| FetchError::io(part_path, e))
}
