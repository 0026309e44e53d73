//! Driftnet main entry point
//!
//! Command-line interface for running a crawl session from a TOML config.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Driftnet: a crawl orchestration engine
///
/// Reads seed URLs and engine knobs from a TOML configuration, then runs a
/// single session: bounded-concurrency fetching, idle detection, and an
/// orderly shutdown once the crawl is quiescent.
#[derive(Parser, Debug)]
#[command(name = "driftnet")]
#[command(version = "0.1.0")]
#[command(about = "A crawl orchestration engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

    /// Keep the session open when idle; close only on interrupt
    #[arg(long)]
    no_close: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = driftnet::config::load_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    tracing::info!(
        "Starting session: {} seeds, concurrency ceiling {}",
        config.seed.len(),
        config.engine.max_concurrent_fetches
    );

    let stats = driftnet::engine::run(config, !cli.no_close)
        .await
        .context("session failed")?;

    tracing::info!(
        "Session finished: {} dispatched, {} succeeded",
        stats
            .requests_dispatched
            .load(std::sync::atomic::Ordering::SeqCst),
        stats
            .requests_succeeded
            .load(std::sync::atomic::Ordering::SeqCst),
    );
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("driftnet=info,warn"),
            1 => EnvFilter::new("driftnet=debug,info"),
            2 => EnvFilter::new("driftnet=trace,debug"),
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

/// Handles --dry-run: validates config and shows what would be crawled
fn handle_dry_run(config: &driftnet::Config) {
    println!("=== Driftnet Dry Run ===\n");

    println!("Engine:");
    println!(
        "  Max concurrent fetches: {}",
        config.engine.max_concurrent_fetches
    );
    println!(
        "  Request timeout: {}s",
        config.engine.request_timeout_secs
    );
    println!("  Grace delay: {}ms", config.engine.grace_delay_ms);
    println!(
        "  Heartbeat interval: {}ms",
        config.engine.heartbeat_interval_ms
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nSeeds ({}):", config.seed.len());
    for entry in &config.seed {
        println!("  - {} (priority {})", entry.url, entry.priority);
    }

    println!("\n✓ Configuration is valid");
}
