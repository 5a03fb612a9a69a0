//! Sumi-Crawl main entry point
//!
//! This is the command-line interface for the Sumi-Crawl crawler.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use sumi_crawl::config::{load_config_with_hash, validate, CrawlConfiguration};
use sumi_crawl::output::{print_summary, write_markdown_summary};
use sumi_crawl::{CrawlController, ProcessedPage};
use tracing_subscriber::EnvFilter;

/// Sumi-Crawl: a polite concurrent web crawler
///
/// Crawls outward from a seed URL with a bounded pool of workers, a
/// per-host politeness delay and optional robots.txt support, reporting
/// every fetched page as it completes.
#[derive(Parser, Debug)]
#[command(name = "sumi-crawl")]
#[command(version)]
#[command(about = "A polite concurrent web crawler", long_about = None)]
struct Cli {
    /// URL to start crawling from
    #[arg(value_name = "SEED")]
    seed: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stop after this many pages (0 = unbounded)
    #[arg(long, value_name = "N")]
    max_pages: Option<u64>,

    /// Number of concurrent fetch workers
    #[arg(long, value_name = "N")]
    workers: Option<u32>,

    /// Enable rendering and wait this long before capturing each page
    #[arg(long, value_name = "MILLIS")]
    render_wait: Option<u64>,

    /// Minimum delay between requests to the same host
    #[arg(long, value_name = "MILLIS")]
    politeness: Option<u64>,

    /// Fail unless some crawled page contains this text
    #[arg(long, value_name = "TEXT")]
    expect: Option<String>,

    /// Write a markdown summary to this path
    #[arg(long, value_name = "FILE")]
    summary: Option<PathBuf>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;

    if cli.dry_run {
        handle_dry_run(&cli.seed, &config);
        return Ok(());
    }

    handle_crawl(cli, config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_crawl=info,warn"),
            1 => EnvFilter::new("sumi_crawl=debug,info"),
            2 => EnvFilter::new("sumi_crawl=trace,debug"),
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

/// Loads the config file (if any) and applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<CrawlConfiguration> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => CrawlConfiguration::default(),
    };

    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages_to_crawl = max_pages;
    }
    if let Some(workers) = cli.workers {
        config.crawler.max_concurrent_workers = workers;
    }
    if let Some(wait) = cli.render_wait {
        config.rendering.javascript_rendering_enabled = true;
        config.rendering.render_wait_millis = wait;
    }
    if let Some(delay) = cli.politeness {
        config.crawler.politeness_delay_millis = delay;
    }

    validate(&config).context("Invalid configuration")?;
    Ok(config)
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(seed: &str, config: &CrawlConfiguration) {
    println!("=== Sumi-Crawl Dry Run ===\n");

    println!("Seed: {}\n", seed);

    println!("Crawler Configuration:");
    println!("  Max pages: {}", config.crawler.max_pages_to_crawl);
    println!("  Workers: {}", config.crawler.max_concurrent_workers);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max pages per host: {}", config.crawler.max_pages_per_host);
    println!(
        "  Politeness delay: {}ms",
        config.crawler.politeness_delay_millis
    );
    println!("  Fetch timeout: {}ms", config.crawler.fetch_timeout_millis);
    println!(
        "  Crawl external pages: {}",
        config.crawler.crawl_external_pages
    );
    println!("  Respect robots.txt: {}", config.crawler.respect_robots_txt);

    println!("\nRendering:");
    println!(
        "  JavaScript rendering: {}",
        config.rendering.javascript_rendering_enabled
    );
    println!("  Render wait: {}ms", config.rendering.render_wait_millis);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\n✓ Configuration is valid");
}

fn report_page(page: &ProcessedPage) {
    match &page.error {
        None => tracing::info!(
            "{} [{}] {} links, {}ms",
            page.url,
            page.http_status.unwrap_or_default(),
            page.discovered_links.len(),
            page.elapsed_millis
        ),
        Some(e) => tracing::warn!("{} failed: {}", page.url, e),
    }
}

/// Handles the main crawl operation
async fn handle_crawl(cli: Cli, config: CrawlConfiguration) -> anyhow::Result<()> {
    let controller = Arc::new(CrawlController::new(config).context("Failed to build crawler")?);
    let mut events = controller.subscribe();

    controller
        .start(&cli.seed)
        .await
        .with_context(|| format!("Failed to start crawl at {}", cli.seed))?;

    let interrupt = {
        let controller = controller.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping crawl");
                controller.stop();
            }
        })
    };

    let mut matched = false;
    while let Some(page) = events.recv().await {
        report_page(&page);
        if let Some(expected) = &cli.expect {
            matched |= page.text_contains(expected);
        }
    }

    let summary = controller.wait().await.context("Crawl failed")?;
    interrupt.abort();

    if !cli.quiet {
        print_summary(&summary);
    }

    if let Some(path) = &cli.summary {
        write_markdown_summary(&summary, &cli.seed, path)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        tracing::info!("Summary written to {}", path.display());
    }

    if let Some(expected) = &cli.expect {
        if !matched {
            bail!("No crawled page contained {:?}", expected);
        }
        if !cli.quiet {
            println!("\n✓ Found {:?}", expected);
        }
    }

    Ok(())
}
