//! Constants for the fetch module (timeouts, naming, defaults).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle read timeout: longest wait for the next bytes (5 minutes).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default number of segments a resource is split into.
pub const DEFAULT_SEGMENT_COUNT: u64 = 30;

/// Upper bound on segments per resource.
pub const MAX_SEGMENT_COUNT: u64 = 256;

/// Prefix of the per-resource staging directory name.
pub const STAGING_PREFIX: &str = "tmp_";

/// Extension of segment part files inside a staging directory.
pub const PART_EXTENSION: &str = "part";

/// Suffix of the output file while a merge is in progress.
pub const MERGE_SUFFIX: &str = ".partial";

/// Default input list file read by the CLI.
pub const DEFAULT_INPUT_FILE: &str = "input.txt";
