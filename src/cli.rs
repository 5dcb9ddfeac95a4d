//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use rangefetch_core::fetch::constants::{
    DEFAULT_INPUT_FILE, DEFAULT_SEGMENT_COUNT, MAX_SEGMENT_COUNT, READ_TIMEOUT_SECS,
};

/// Fetch files over HTTP in parallel byte-range segments.
///
/// Each URL is probed, split into segments fetched concurrently into part
/// files, and merged into a single output file. Interrupted runs resume from
/// the part files already on disk.
#[derive(Parser, Debug)]
#[command(name = "rangefetch")]
#[command(author, version, about)]
pub struct Args {
    /// URLs to fetch (otherwise read from --input-file or stdin)
    pub urls: Vec<String>,

    /// Newline-delimited URL list used when no URLs are given
    #[arg(short = 'i', long, default_value = DEFAULT_INPUT_FILE)]
    pub input_file: PathBuf,

    /// Segments per resource (1-256)
    #[arg(short = 's', long, default_value_t = DEFAULT_SEGMENT_COUNT, value_parser = clap::value_parser!(u64).range(1..=MAX_SEGMENT_COUNT))]
    pub segments: u64,

    /// Directory merged files are written to
    #[arg(short = 'o', long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Directory staging directories are created under (defaults to the output directory)
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Maximum retries per segment for transient failures (0-10)
    #[arg(short = 'r', long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// Seconds to wait for more bytes before a request times out (1-3600)
    #[arg(short = 't', long, default_value_t = READ_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout: u64,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Staging root, falling back to the output directory.
    #[must_use]
    pub fn staging_root(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.clone())
    }

    /// Attempts per segment: the first try plus `max_retries`.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        u32::from(self.max_retries) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["rangefetch"]).unwrap();
        assert!(args.urls.is_empty());
        assert_eq!(args.input_file, PathBuf::from("input.txt"));
        assert_eq!(args.segments, 30);
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert_eq!(args.staging_dir, None);
        assert_eq!(args.max_retries, 0);
        assert_eq!(args.read_timeout, 300);
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
    }

    #[test]
    fn test_cli_positional_urls() {
        let args = Args::try_parse_from([
            "rangefetch",
            "https://example.com/a.iso",
            "https://example.com/b.iso",
        ])
        .unwrap();
        assert_eq!(args.urls.len(), 2);
        assert_eq!(args.urls[1], "https://example.com/b.iso");
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["rangefetch", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["rangefetch", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["rangefetch", "--quiet"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["rangefetch", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["rangefetch", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["rangefetch", "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    // ==================== Segments Tests ====================

    #[test]
    fn test_cli_segments_short_and_long_flag() {
        let args = Args::try_parse_from(["rangefetch", "-s", "8"]).unwrap();
        assert_eq!(args.segments, 8);

        let args = Args::try_parse_from(["rangefetch", "--segments", "256"]).unwrap();
        assert_eq!(args.segments, 256);
    }

    #[test]
    fn test_cli_segments_zero_rejected() {
        let err = Args::try_parse_from(["rangefetch", "-s", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_segments_over_max_rejected() {
        let err = Args::try_parse_from(["rangefetch", "-s", "257"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_segments_non_numeric_rejected() {
        let err = Args::try_parse_from(["rangefetch", "-s", "many"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    // ==================== Directory Tests ====================

    #[test]
    fn test_cli_staging_root_defaults_to_output_dir() {
        let args = Args::try_parse_from(["rangefetch", "-o", "out"]).unwrap();
        assert_eq!(args.staging_root(), PathBuf::from("out"));

        let args =
            Args::try_parse_from(["rangefetch", "-o", "out", "--staging-dir", "scratch"]).unwrap();
        assert_eq!(args.staging_root(), PathBuf::from("scratch"));
    }

    #[test]
    fn test_cli_input_file_flag() {
        let args = Args::try_parse_from(["rangefetch", "-i", "urls.txt"]).unwrap();
        assert_eq!(args.input_file, PathBuf::from("urls.txt"));
    }

    // ==================== Max Retries Tests ====================

    #[test]
    fn test_cli_max_retries_maps_to_attempts() {
        let args = Args::try_parse_from(["rangefetch"]).unwrap();
        assert_eq!(args.max_attempts(), 1);

        let args = Args::try_parse_from(["rangefetch", "-r", "3"]).unwrap();
        assert_eq!(args.max_attempts(), 4);
    }

    #[test]
    fn test_cli_max_retries_over_max_rejected() {
        let err = Args::try_parse_from(["rangefetch", "--max-retries", "11"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    // ==================== Read Timeout Tests ====================

    #[test]
    fn test_cli_read_timeout_flag() {
        let args = Args::try_parse_from(["rangefetch", "-t", "60"]).unwrap();
        assert_eq!(args.read_timeout, 60);
    }

    #[test]
    fn test_cli_read_timeout_bounds() {
        let err = Args::try_parse_from(["rangefetch", "-t", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let err = Args::try_parse_from(["rangefetch", "-t", "3601"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
