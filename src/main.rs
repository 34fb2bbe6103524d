//! Paged-Harvest main entry point
//!
//! This is the command-line interface for the Paged-Harvest table harvester.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use paged_harvest::config::{load_config_with_hash, validate, Config, PagerStrategy};
use paged_harvest::output::{print_statistics, JsonOutputHandler, OutputHandler};
use paged_harvest::provider::HttpViewProvider;
use paged_harvest::CrawlSession;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Paged-Harvest: a gated, paginated table harvester
///
/// Paged-Harvest walks a paginated results view page by page, waits out
/// human-verification gates, extracts table records and writes them,
/// deduplicated, to a JSON file.
#[derive(Parser, Debug)]
#[command(name = "paged-harvest")]
#[command(version)]
#[command(about = "A gated, paginated table harvester", long_about = None)]
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

    /// Validate config and show what would be harvested without harvesting
    #[arg(long)]
    dry_run: bool,

    /// Override the configured base location
    #[arg(long, value_name = "URL")]
    base_location: Option<String>,

    /// Stop after this many pages
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Override the configured pagination strategy
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Write the JSON result here instead of the configured path
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Interactive,
    Rewrite,
}

impl From<StrategyArg> for PagerStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Interactive => PagerStrategy::Interactive,
            StrategyArg::Rewrite => PagerStrategy::Rewrite,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    apply_overrides(&mut config, &cli);
    validate(&config).context("Invalid configuration after command-line overrides")?;

    if cli.dry_run {
        handle_dry_run(&config, &cli);
        return Ok(());
    }

    handle_harvest(config, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("paged_harvest=info,warn"),
            1 => EnvFilter::new("paged_harvest=debug,info"),
            2 => EnvFilter::new("paged_harvest=trace,debug"),
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

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(location) = &cli.base_location {
        config.target.base_location = location.clone();
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = Some(max_pages);
    }
    if let Some(strategy) = cli.strategy {
        config.crawler.strategy = strategy.into();
    }
}

fn output_handler(config: &Config, cli: &Cli) -> JsonOutputHandler {
    match &cli.output {
        Some(path) => JsonOutputHandler::new(path),
        None => JsonOutputHandler::from_option(config.output.json_path.as_deref()),
    }
}

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config, cli: &Cli) {
    println!("=== Paged-Harvest Dry Run ===\n");

    println!("Target:");
    println!("  Base location: {}", config.target.base_location);
    println!("  Results pattern: {}", config.target.results_pattern);
    println!("  Login pattern: {}", config.target.login_pattern);
    println!("  Page parameter: {}", config.target.page_param);

    println!("\nCrawler:");
    println!("  Strategy: {:?}", config.crawler.strategy);
    println!("  Gate timeout: {}s", config.crawler.gate_timeout_secs);
    println!("  Gate poll interval: {}ms", config.crawler.gate_poll_interval_ms);
    println!("  Results timeout: {}s", config.crawler.results_timeout_secs);
    match config.crawler.max_pages {
        Some(max) => println!("  Max pages: {}", max),
        None => println!("  Max pages: unlimited"),
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.agent_string());

    println!("\nSelectors:");
    println!("  Pagination: {}", config.selectors.pagination.join(", "));
    println!("  Page number: {}", config.selectors.page_number);
    println!("  Next page: {}", config.selectors.next_page);

    println!("\nOutput:");
    println!("  JSON: {}", output_handler(config, cli).destination());

    println!("\n✓ Configuration is valid");
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, cli: &Cli) -> anyhow::Result<()> {
    let handler = output_handler(&config, cli);
    let provider = HttpViewProvider::new(&config.user_agent).context("Failed to build HTTP client")?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current step");
            ctrl_c.cancel();
        }
    });

    let result = CrawlSession::new(config, provider)
        .with_cancellation(cancel)
        .run()
        .await;

    // Partial results are written for aborted crawls too
    handler
        .write(&result)
        .with_context(|| format!("Failed to write {}", handler.destination()))?;

    if !cli.quiet {
        print_statistics(&result);
        println!("\nResults written to: {}", handler.destination());
    }

    if let Some(reason) = result.status().abort_reason() {
        tracing::error!("Harvest aborted: {}", reason);
    }

    Ok(())
}
