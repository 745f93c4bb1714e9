//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest topic harvester.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_harvest::config::{load_config_with_hash, Config, ProgressMode};
use sumi_harvest::crawler::{harvest, ProgressLogWriter};
use sumi_harvest::fetch::user_agent;
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: a polite single-site harvester
///
/// Sumi-Harvest discovers topic pages through a site's sitemap, fetches
/// them while respecting robots.txt, and writes each topic's metadata and
/// image to disk.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite single-site harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", default_value = "harvest.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Print throttled progress lines instead of a progress bar
    #[arg(long, env = "CI")]
    batch: bool,

    /// Validate config and show what would be harvested without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.batch {
        config.crawler.progress = ProgressMode::Batch;
    }

    if cli.dry_run {
        print_dry_run(&config);
        return Ok(());
    }

    let summary = match harvest(&config).await {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            return Err(e.into());
        }
    };

    println!(
        "Harvested {} topic(s) from {} page(s), {} image(s) saved",
        summary.topics, summary.pages, summary.assets
    );

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(ProgressLogWriter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --dry-run: shows the resolved settings
fn print_dry_run(config: &Config) {
    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max concurrent pages: {}",
        config.crawler.max_concurrent_pages
    );
    println!("  Progress: {:?}", config.crawler.progress);
    println!(
        "  Progress interval: {}ms",
        config.crawler.progress_interval_ms
    );

    println!("\nUser Agent:");
    println!("  {}", user_agent(&config.user_agent.crawler_identity));

    println!("\nRetry:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!("  Base delay: {}ms", config.retry.base_delay_ms);
    println!(
        "  Timeouts: connect {}s, read {}s",
        config.timeouts.connect_secs, config.timeouts.read_secs
    );

    println!("\nTarget:");
    println!("  Site: {}", config.target.site);
    println!("  Sitemap filter: {}", config.target.sitemap_filter);
    println!("  Asset prefix: {}", config.target.asset_prefix);
    println!("  Whitelist ({}):", config.target.whitelist.len());
    for host in &config.target.whitelist {
        println!("    - {}", host);
    }

    println!("\nOutput:");
    println!("  Assets: {}", config.output.assets_dir);
    println!("  Metadata: {}", config.output.metadata_path);

    println!("\n✓ Configuration is valid");
}
