//! Forum-Scraper main entry point
//!
//! This is the command-line interface for the Forum-Scraper crawler.

use clap::Parser;
use forum_scraper::config::{load_config_with_hash, Config};
use forum_scraper::crawler::{run_crawl_until, CrawlOutcome};
use forum_scraper::storage::{remove_database_files, SqliteStorage};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit status after Ctrl-C (128 + SIGINT)
const EXIT_INTERRUPTED: u8 = 130;

/// Forum-Scraper: a polite crawler for paginated web forums
///
/// Forum-Scraper walks a forum's subforums, threads and posts one page at a
/// time, at a fixed request rate, and stores everything in a SQLite database.
/// Re-running is safe: records already stored are left untouched.
#[derive(Parser, Debug)]
#[command(name = "forum-scraper")]
#[command(version = "1.0.0")]
#[command(about = "A polite crawler for paginated web forums", long_about = None)]
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

    /// Delete the existing database before crawling
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "export_summary"])]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "export_summary"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_summary"])]
    stats: bool,

    /// Generate markdown summary from existing data and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_summary: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_summary {
        handle_export_summary(&config)?;
    } else {
        return handle_crawl(config, cli.fresh).await;
    }

    Ok(ExitCode::SUCCESS)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("forum_scraper=info,warn"),
            1 => EnvFilter::new("forum_scraper=debug,info"),
            2 => EnvFilter::new("forum_scraper=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Forum-Scraper Dry Run ===\n");

    println!("Forum:");
    println!("  Base URL: {}", config.forum.base_url);

    println!("\nCrawler Configuration:");
    println!(
        "  Delay between requests: {}ms",
        config.crawler.delay_between_requests
    );
    println!("  Delay between subforums: {}ms", config.crawler.subforum_delay);
    println!("  Max attempts per page: {}", config.crawler.max_retries);
    println!("  Retry delay: {}ms (linear backoff)", config.crawler.retry_delay);
    println!(
        "  Download attachments: {}",
        if config.crawler.download_attachments { "yes" } else { "no" }
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Summary: {}", config.output.summary_path);

    let selectors = &config.selectors;
    println!("\nSelectors:");
    for (name, selector) in [
        ("subforum-link", &selectors.subforum_link),
        ("thread-link", &selectors.thread_link),
        ("next-page", &selectors.next_page),
        ("post-container", &selectors.post_container),
        ("post-username", &selectors.post_username),
        ("post-content", &selectors.post_content),
        ("post-date", &selectors.post_date),
        ("thread-author", &selectors.thread_author),
        ("thread-date", &selectors.thread_date),
        ("attachment-link", &selectors.attachment_link),
    ] {
        println!("  {:<16} {}", name, selector);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling at {}", config.forum.base_url);
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use forum_scraper::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    storage.close()?;
    Ok(())
}

/// Handles the --export-summary mode: generates markdown summary
fn handle_export_summary(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use forum_scraper::output::{generate_markdown_summary, generate_summary};

    println!("=== Exporting Forum Summary ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.summary_path);
    println!();

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;

    tracing::info!("Loading forum data from database...");
    let summary = generate_summary(&storage)?;

    tracing::info!("Generating markdown summary...");
    generate_markdown_summary(&summary, Path::new(&config.output.summary_path))?;

    storage.close()?;
    println!("✓ Summary exported to: {}", config.output.summary_path);

    Ok(())
}

/// Handles the main crawl operation
///
/// Ctrl-C abandons the crawl at its current await point. Every record saved
/// so far is already committed, so the store is closed and the process exits
/// with status 130.
async fn handle_crawl(config: Config, fresh: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let database_path = Path::new(&config.output.database_path);
    if fresh {
        tracing::info!("Starting fresh crawl (removing {})", database_path.display());
        remove_database_files(database_path)?;
    } else {
        tracing::info!("Starting crawl (existing records are kept)");
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match run_crawl_until(&config, shutdown).await {
        Ok(CrawlOutcome::Completed(stats)) => {
            tracing::info!(
                "Crawl completed successfully in {:?}",
                stats.elapsed()
            );
            Ok(ExitCode::SUCCESS)
        }
        Ok(CrawlOutcome::Interrupted(stats)) => {
            tracing::warn!(
                "Interrupted after {} threads and {} posts; database closed",
                stats.threads,
                stats.posts
            );
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
