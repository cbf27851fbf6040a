//! Star-Crawler main entry point
//!
//! This is the command-line interface for the Star-Crawler repository harvester.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use star_crawler::config::{load_config_with_hash, Config};
use star_crawler::crawler::Coordinator;
use star_crawler::query::{build_queries, FacetDimensions};
use star_crawler::CrawlError;
use tracing_subscriber::EnvFilter;

/// Star-Crawler: a quota-aware repository search harvester
///
/// Star-Crawler splits the repository search space into disjoint facets,
/// pages through every facet under the API's rate limits, and records each
/// repository together with a daily star history.
#[derive(Parser, Debug)]
#[command(name = "star-crawler")]
#[command(version)]
#[command(about = "A quota-aware repository search harvester", long_about = None)]
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

    /// Override the number of records to collect
    #[arg(long, value_name = "N")]
    target: Option<usize>,

    /// Validate config and show the generated queries without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Credentials may live in a local .env file
    dotenvy::dotenv().ok();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(target) = cli.target {
        config.crawler.target_count = target;
    }

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(&config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("star_crawler=info,warn"),
            1 => EnvFilter::new("star_crawler=debug,info"),
            2 => EnvFilter::new("star_crawler=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Star-Crawler Dry Run ===\n");

    println!("API:");
    println!("  Endpoint: {}", config.api.endpoint);
    println!("  Token variable: {}", config.api.token_env);
    println!("  Page size: {}", config.api.page_size);

    println!("\nCrawler:");
    println!("  Target records: {}", config.crawler.target_count);
    println!("  Max concurrency: {}", config.crawler.max_concurrency);
    println!("  Flush threshold: {}", config.crawler.flush_threshold);

    println!("\nRate Limit:");
    println!(
        "  {} requests per {}s, quota floor {}",
        config.rate_limit.requests_per_hour,
        config.rate_limit.window_secs,
        config.rate_limit.quota_floor
    );

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    let dimensions = FacetDimensions::from_config(&config.search)?;
    let queries = build_queries(&dimensions);

    println!(
        "\nFacets: {} languages x {} windows x {} star ranges",
        dimensions.languages.len(),
        dimensions.windows.len(),
        dimensions.star_ranges.len()
    );
    println!("\nQueries ({}):", queries.len());
    for query in &queries {
        println!("  - {}", query);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use star_crawler::output::{load_statistics, print_statistics};
    use star_crawler::storage::SqliteStorage;

    println!("Database: {}\n", config.storage.database_path);

    let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;
    let stats = load_statistics(&storage, chrono::Utc::now().date_naive())?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str) -> Result<(), Box<dyn std::error::Error>> {
    let token = std::env::var(&config.api.token_env)
        .ok()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| CrawlError::MissingToken(config.api.token_env.clone()))?;

    let mut coordinator = Coordinator::new(config, token, config_hash)?;

    let shutdown = coordinator.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing the current batch");
            shutdown.store(true, Ordering::SeqCst);
        }
    });

    match coordinator.run().await {
        Ok(summary) => {
            println!("{}", summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
