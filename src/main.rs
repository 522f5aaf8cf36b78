//! Roster-Crawler main entry point
//!
//! This is the command-line interface for the Roster-Crawler listing crawler.

use anyhow::Context;
use clap::Parser;
use roster_crawler::config::{load_config_with_hash, validate, Config};
use roster_crawler::crawler::{Coordinator, EntityExtractor};
use roster_crawler::output::{
    print_run_summary, read_snapshot, JsonFileSink, RunSummary, Snapshot, SnapshotSink,
};
use roster_crawler::url::ListingTemplate;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Roster-Crawler: a paced listing-site crawler
///
/// Roster-Crawler walks the numbered pages of an actor listing, extracts
/// identifier/name pairs from each page, stops when a page comes back short,
/// and writes the merged result as a JSON snapshot.
#[derive(Parser, Debug)]
#[command(name = "roster-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A paced listing-site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the page ceiling
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Override the snapshot output path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["show", "extract"])]
    dry_run: bool,

    /// Print the summary of an existing snapshot and exit
    #[arg(long, value_name = "SNAPSHOT", conflicts_with_all = ["dry_run", "extract"])]
    show: Option<PathBuf>,

    /// Run the extractor on a saved listing page and exit
    #[arg(long, value_name = "HTML_FILE", conflicts_with_all = ["dry_run", "show"])]
    extract: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    if let Some(path) = &cli.show {
        return handle_show(path);
    }

    let config = match load_configuration(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {:#}", e);
            return Err(e);
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)
    } else if let Some(path) = &cli.extract {
        handle_extract(&config, path)
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("roster_crawler=info,warn"),
            1 => EnvFilter::new("roster_crawler=debug,info"),
            2 => EnvFilter::new("roster_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (or defaults), applies CLI overrides and validates
fn load_configuration(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("reading {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(max_pages) = cli.max_pages {
        config.pagination.max_pages = max_pages;
    }
    if let Some(output) = &cli.output {
        config.output.path = output.display().to_string();
    }

    validate(&config)?;
    Ok(config)
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let template = ListingTemplate::new(&config.site)?;
    let extractor = EntityExtractor::new(&config.extract)?;

    println!("=== Roster-Crawler Dry Run ===\n");

    println!("Listing:");
    println!("  URL template: {}", template);
    println!("  Referer: {}", config.site.referer);
    println!("  Max pages: {}", config.pagination.max_pages);
    println!(
        "  Full page threshold: {} records",
        config.pagination.full_page_threshold
    );
    println!();

    println!("Fetching:");
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!(
        "  Attempts per page: {} ({}ms apart)",
        config.fetch.max_retries, config.fetch.retry_delay_ms
    );
    println!(
        "  Pacing: {}-{}ms",
        config.fetch.pacing_min_ms, config.fetch.pacing_max_ms
    );
    println!(
        "  Rate-limit budget: {} waits / {}ms",
        config.fetch.rate_limit_max_waits, config.fetch.rate_limit_max_total_wait_ms
    );
    println!("  User agents: {}", config.fetch.user_agents.len());
    println!();

    println!("Record selectors (priority order):");
    for (i, matcher) in extractor.matchers().iter().enumerate() {
        println!("  {}. {}", i + 1, matcher.source());
    }
    println!();

    println!("First pages:");
    for page in 1..=config.pagination.max_pages.min(3) {
        println!("  {}", template.page(page)?.url);
    }
    println!();

    println!("Output: {} (UTC{:+})", config.output.path, config.output.utc_offset_hours);
    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --show mode: prints the summary of an existing snapshot
fn handle_show(path: &Path) -> anyhow::Result<()> {
    let snapshot = read_snapshot(path)?;

    println!("=== Snapshot: {} ===\n", path.display());
    println!("  Last updated: {}", snapshot.last_updated);
    println!("  Total count: {}", snapshot.total_count);
    if snapshot.total_count != snapshot.entities.len() {
        println!(
            "  Warning: file lists {} entities but total_count says {}",
            snapshot.entities.len(),
            snapshot.total_count
        );
    }
    println!();

    for (identifier, name) in snapshot.entities.iter().take(10) {
        println!("  {}  {}", identifier, name);
    }
    if snapshot.entities.len() > 10 {
        println!("  ... and {} more", snapshot.entities.len() - 10);
    }
    Ok(())
}

/// Handles the --extract mode: runs the extractor on a saved page
fn handle_extract(config: &Config, path: &Path) -> anyhow::Result<()> {
    let extractor = EntityExtractor::new(&config.extract)?;
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let extraction = extractor.extract_html(&html);

    println!("=== Extraction: {} ===\n", path.display());
    match &extraction.matcher {
        Some(matcher) => println!("  Matcher: {}", matcher),
        None => println!("  Matcher: none matched"),
    }
    println!("  Candidates: {}", extraction.candidates);
    println!("  Records: {}", extraction.records.len());
    println!("  Skipped: {}", extraction.skipped.len());
    println!();

    for record in &extraction.records {
        println!("  {}  {}", record.identifier, record.name);
    }
    for skipped in &extraction.skipped {
        println!("  [card {}] {}", skipped.position, skipped.reason);
    }
    Ok(())
}

/// Handles the main crawl mode
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let coordinator = Coordinator::new(config.clone())?;

    let token = coordinator.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping before the next page");
            token.cancel();
        }
    });

    let outcome = coordinator.run().await?;

    let sink = JsonFileSink::new(&config.output.path);
    let snapshot = Snapshot::stamped(outcome.entities, config.output.utc_offset_hours)?;
    let persisted = sink.write(&snapshot);

    let summary = RunSummary::new(
        outcome.stats,
        outcome.stop_reason,
        config.pagination.max_pages,
        &snapshot,
        sink.location(),
        &persisted,
    );
    print_run_summary(&summary);

    if let Err(e) = persisted {
        tracing::error!("Failed to save snapshot: {}", e);
        return Err(e.into());
    }

    Ok(())
}
