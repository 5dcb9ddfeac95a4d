//! Staging directory and part-file naming for in-flight segments.
//!
//! Layout for a resource named `file.iso` split into 3 segments:
//!
//! ```text
//! <staging_root>/tmp_file.iso/file.iso_0_3.part
//! <staging_root>/tmp_file.iso/file.iso_1_3.part
//! <staging_root>/tmp_file.iso/file.iso_2_3.part
//! ```
//!
//! The segment count is part of the name, so fetching the same resource
//! with a different split never picks up the wrong part files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use super::FetchError;
use super::constants::{PART_EXTENSION, STAGING_PREFIX};

/// Returns the staging directory for a resource under `root`.
#[must_use]
pub fn staging_dir(root: &Path, file_name: &str) -> PathBuf {
    root.join(format!("{STAGING_PREFIX}{file_name}"))
}

/// Returns the part-file path of one segment.
#[must_use]
pub fn assign_path(
    staging_dir: &Path,
    file_name: &str,
    index: usize,
    segment_count: usize,
) -> PathBuf {
    staging_dir.join(format!(
        "{file_name}_{index}_{segment_count}.{PART_EXTENSION}"
    ))
}

/// Builds the index-ordered part-file table for a plan of `segment_count`
/// segments.
///
/// Each slot is written exactly once, by its own index.
#[must_use]
pub fn assign_paths(staging_dir: &Path, file_name: &str, segment_count: usize) -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::new(); segment_count];
    for (index, slot) in paths.iter_mut().enumerate() {
        *slot = assign_path(staging_dir, file_name, index, segment_count);
    }
    paths
}

/// Creates the staging directory if it does not exist yet.
///
/// A directory left behind by an interrupted run is expected and reused.
///
/// # Errors
///
/// Returns [`FetchError::Io`] if the directory cannot be created, or if the
/// path exists but is not a directory.
#[instrument(level = "debug", fields(path = %path.display()))]
pub async fn ensure_staging_dir(path: &Path) -> Result<(), FetchError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => {
            debug!("staging directory exists, reusing");
            return Ok(());
        }
        Ok(_) => {
            return Err(FetchError::io(
                path,
                std::io::Error::new(ErrorKind::AlreadyExists, "staging path is not a directory"),
            ));
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(FetchError::io(path, e)),
    }

    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| FetchError::io(path, e))?;
    debug!("created staging directory");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_staging_dir_uses_prefix() {
        let dir = staging_dir(Path::new("/data"), "file.iso");
        assert_eq!(dir, PathBuf::from("/data/tmp_file.iso"));
    }

    #[test]
    fn test_assign_path_encodes_index_and_count() {
        let path = assign_path(Path::new("/data/tmp_file.iso"), "file.iso", 2, 3);
        assert_eq!(path, PathBuf::from("/data/tmp_file.iso/file.iso_2_3.part"));
    }

    #[test]
    fn test_assign_paths_ordered_and_unique() {
        let paths = assign_paths(Path::new("stage"), "a.bin", 7);
        assert_eq!(paths.len(), 7);
        for (i, path) in paths.iter().enumerate() {
            assert_eq!(*path, assign_path(Path::new("stage"), "a.bin", i, 7));
        }
        let unique: HashSet<_> = paths.iter().collect();
        assert_eq!(unique.len(), 7);
    }

    #[test]
    fn test_assign_paths_differ_across_split_counts() {
        let three = assign_paths(Path::new("stage"), "a.bin", 3);
        let seven = assign_paths(Path::new("stage"), "a.bin", 7);
        assert!(three.iter().all(|p| !seven.contains(p)));
    }

    #[test]
    fn test_ensure_staging_dir_creates_and_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = staging_dir(temp.path(), "a.bin");

        tokio_test::block_on(ensure_staging_dir(&dir)).unwrap();
        assert!(dir.is_dir());

        std::fs::write(dir.join("a.bin_0_1.part"), b"kept").unwrap();
        tokio_test::block_on(ensure_staging_dir(&dir)).unwrap();
        assert_eq!(std::fs::read(dir.join("a.bin_0_1.part")).unwrap(), b"kept");
    }

    #[test]
    fn test_ensure_staging_dir_rejects_regular_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tmp_a.bin");
        std::fs::write(&path, b"not a dir").unwrap();

        let result = tokio_test::block_on(ensure_staging_dir(&path));
        assert!(matches!(result, Err(FetchError::Io { .. })));
    }
}
