//! CLI entry point for the rangefetch tool.

use std::io::{self, IsTerminal, Read};

use anyhow::{Context, Result, bail};
use clap::Parser;
use rangefetch_core::fetch::constants::CONNECT_TIMEOUT_SECS;
use rangefetch_core::input::parse_input_args;
use rangefetch_core::{FetchConfig, FetchCoordinator, HttpClient, RetryPolicy, parse_input_list};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    // Input: positional args, then the input file, then piped stdin
    let input = if !args.urls.is_empty() {
        parse_input_args(&args.urls)
    } else if args.input_file.is_file() {
        let text = tokio::fs::read_to_string(&args.input_file)
            .await
            .with_context(|| format!("failed to read {}", args.input_file.display()))?;
        parse_input_list(&text)
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        parse_input_list(&buffer)
    } else {
        info!(
            input_file = %args.input_file.display(),
            "No input provided. Pass URLs as arguments, list them in the input file, or pipe them via stdin."
        );
        return Ok(());
    };

    for skipped in &input.skipped {
        warn!(skipped = %skipped, "Skipped invalid URL");
    }
    if input.is_empty() {
        info!("No valid URLs found in input");
        return Ok(());
    }
    info!(
        urls = input.len(),
        skipped = input.skipped_count(),
        segments = args.segments,
        "Parsed input"
    );

    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;

    let client = HttpClient::with_timeouts(CONNECT_TIMEOUT_SECS, args.read_timeout)
        .context("failed to build HTTP client")?;
    let config = FetchConfig::new(&args.output_dir)
        .with_staging_root(args.staging_root())
        .with_retry_policy(RetryPolicy::with_max_attempts(args.max_attempts()));

    let cancel = CancellationToken::new();
    let coordinator = FetchCoordinator::new(client, config).with_cancellation(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping fetches (segment files are kept for resume)");
            cancel.cancel();
        }
    });

    let stats = coordinator.fetch_all(input.urls, args.segments).await;

    info!(
        completed = stats.completed,
        failed = stats.failed,
        skipped = stats.skipped,
        total = stats.total(),
        "Fetch complete"
    );

    if stats.failed > 0 {
        bail!("{} of {} resources failed", stats.failed, stats.total());
    }
    Ok(())
}
