//! Scrapeline main entry point
//!
//! This is the command-line interface for the Scrapeline ingestion pipeline.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use scrapeline::config::{load_config_with_hash, Config, FetcherConfig, RewriterConfig};
use scrapeline::dispatch::{Dispatcher, ResultSink};
use scrapeline::fetcher::PageFetcher;
use scrapeline::ingest::{import_urls, PollLoop, SourceCursor};
use scrapeline::jobs::{JobStore, SinkTarget};
use scrapeline::output::{print_feed, FeedSummary};
use scrapeline::rewrite::{rewrite_pending, OllamaRewriter};
use scrapeline::storage::{open_store, LazyStore, ScrapeArchive, StoreHandle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

/// How often the `run` command logs the job feed
const FEED_INTERVAL: Duration = Duration::from_secs(1);

/// Scrapeline: URL ingestion and scrape pipeline
///
/// Scrapeline takes URLs from the command line, bulk import files, or rows of
/// a relational table, fetches every page, and records the outcome per job.
#[derive(Parser, Debug)]
#[command(name = "scrapeline")]
#[command(version)]
#[command(about = "URL ingestion and scrape pipeline", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline: poll every configured source until Ctrl-C
    Run {
        /// Path to TOML configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// URL to scrape in addition to polled sources (repeatable)
        #[arg(long = "url", value_name = "URL")]
        urls: Vec<String>,

        /// CSV or text file of URLs to scrape
        #[arg(long, value_name = "FILE")]
        import: Option<PathBuf>,
    },

    /// Scrape a single URL into the archive database
    Scrape {
        url: String,

        /// Archive database path
        #[arg(long, default_value = "scraped_data.db")]
        database: PathBuf,

        /// Request timeout in seconds
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=300))]
        timeout_secs: u64,
    },

    /// Rewrite archived scrapes that have no rewrite yet
    Rewrite {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },

    /// Validate the configuration and inspect every source
    Check {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Run {
            config,
            urls,
            import,
        } => {
            let config = load(&config)?;
            handle_run(config, urls, import).await
        }
        Command::Scrape {
            url,
            database,
            timeout_secs,
        } => handle_scrape(&url, &database, timeout_secs).await,
        Command::Rewrite { config } => handle_rewrite(load(&config)?).await,
        Command::Check { config } => handle_check(load(&config)?).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("scrapeline=info,warn"),
            1 => EnvFilter::new("scrapeline=debug,info"),
            2 => EnvFilter::new("scrapeline=trace,debug"),
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

fn load(path: &Path) -> anyhow::Result<Config> {
    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Builds a lazily connected handle for every configured source
///
/// Nothing is opened here; each source connects on first use and a source
/// that is down is retried on every poll.
fn source_handles(config: &Config) -> HashMap<String, StoreHandle> {
    config
        .sources
        .iter()
        .map(|source| {
            let store = Arc::new(LazyStore::new(source.clone()));
            (source.name.clone(), StoreHandle::from_store(store))
        })
        .collect()
}

/// Handles the `run` command
async fn handle_run(
    config: Config,
    urls: Vec<String>,
    import: Option<PathBuf>,
) -> anyhow::Result<()> {
    let fetcher = PageFetcher::new(&config.fetcher).context("Failed to build HTTP client")?;
    let handles = source_handles(&config);

    let mut sinks = HashMap::new();
    for source in &config.sources {
        if let Some(handle) = handles.get(&source.name) {
            let sink = ResultSink::new(handle.sink.clone());
            if let Err(e) = sink.ensure_schema(&source.output_table).await {
                tracing::warn!(
                    "Could not prepare output table {}.{} yet, retrying on first write: {}",
                    source.name,
                    source.output_table,
                    e
                );
            }
            sinks.insert(source.name.clone(), sink);
        }
    }

    let jobs = Arc::new(JobStore::new());
    let dispatcher = Arc::new(Dispatcher::start(
        &config.dispatcher,
        fetcher,
        Arc::clone(&jobs),
        sinks,
    ));

    let mut pollers: Vec<JoinHandle<()>> = Vec::new();
    for source in &config.sources {
        let Some(handle) = handles.get(&source.name) else {
            continue;
        };
        let cursor = SourceCursor::from_config(source, handle).await;
        tracing::info!(
            "Polling {}.{}.{} every {}s from id {}",
            source.name,
            source.table,
            source.column,
            source.poll_interval_secs,
            cursor.last_seen_id()
        );
        let target = SinkTarget::new(&source.name, &source.output_table);
        pollers.push(PollLoop::new(cursor, Arc::clone(&dispatcher), Some(target)).spawn());
    }

    let mut manual = urls;
    if let Some(path) = import {
        manual.extend(import_urls(&path));
    }
    if !manual.is_empty() {
        let submitted = dispatcher.submit_many(&manual, None)?;
        tracing::info!("Submitted {} URL(s)", submitted.len());
    }

    if pollers.is_empty() {
        if manual.is_empty() {
            bail!("Nothing to do: no sources configured and no URLs given");
        }
        dispatcher.wait_idle().await;
    } else {
        let mut feed = tokio::time::interval(FEED_INTERVAL);
        let mut last_logged = None;
        loop {
            tokio::select! {
                _ = feed.tick() => {
                    let summary = FeedSummary::from_jobs(&jobs.snapshot());
                    if last_logged.as_ref() != Some(&summary) {
                        tracing::info!("{}", summary);
                        last_logged = Some(summary);
                    }
                }
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::error!("Failed to listen for Ctrl-C: {}", e);
                    }
                    tracing::info!("Shutting down");
                    break;
                }
            }
        }
    }

    for poller in &pollers {
        poller.abort();
    }
    dispatcher.shutdown().await;

    print_feed(&jobs.snapshot());
    Ok(())
}

/// Handles the `scrape` command
async fn handle_scrape(url: &str, database: &Path, timeout_secs: u64) -> anyhow::Result<()> {
    let fetcher = PageFetcher::new(&FetcherConfig {
        timeout_secs,
        ..FetcherConfig::default()
    })
    .context("Failed to build HTTP client")?;

    let archive = ScrapeArchive::open(database)
        .with_context(|| format!("Failed to open archive {}", database.display()))?;

    let result = fetcher.fetch(url).await;
    archive.store_result(&result)?;

    match &result.error {
        Some(error) => println!("{} failed: {}", result.scrape_id, error),
        None => println!(
            "{} {} ({})",
            result.scrape_id,
            result.document.metadata.title,
            result.status_code.unwrap_or_default()
        ),
    }
    Ok(())
}

/// Handles the `rewrite` command
async fn handle_rewrite(config: Config) -> anyhow::Result<()> {
    let rewriter_config = config.rewriter.clone().unwrap_or_else(|| {
        tracing::info!("No [rewriter] section, using defaults");
        RewriterConfig::default()
    });
    tracing::info!(
        "Rewriting with model {} at {}",
        rewriter_config.model,
        rewriter_config.endpoint
    );

    let rewriter = OllamaRewriter::new(rewriter_config)?;
    let archive = ScrapeArchive::open(Path::new(&config.output.database_path))?;

    let summary = rewrite_pending(&archive, &rewriter).await?;
    println!(
        "Rewritten: {}, skipped: {}, failed: {}",
        summary.rewritten, summary.skipped, summary.failed
    );
    Ok(())
}

/// Handles the `check` command
async fn handle_check(config: Config) -> anyhow::Result<()> {
    println!("=== Scrapeline Configuration ===\n");
    println!("Fetcher: timeout {}s", config.fetcher.timeout_secs);
    println!(
        "Dispatcher: {} workers, {}ms delay",
        config.dispatcher.workers, config.dispatcher.request_delay_ms
    );
    println!("Archive: {}", config.output.database_path);

    println!("\nSources ({}):", config.sources.len());
    let mut problems = 0;
    for source in &config.sources {
        println!(
            "  - {} ({:?}) {}.{} -> {} [batch {}, every {}s]",
            source.name,
            source.kind,
            source.table,
            source.column,
            source.output_table,
            source.batch_size,
            source.poll_interval_secs
        );

        let handle = match open_store(source).await {
            Ok(handle) => handle,
            Err(e) => {
                println!("    ✗ unavailable: {}", e);
                problems += 1;
                continue;
            }
        };

        let tables = handle.source.list_tables().await?;
        if !tables.contains(&source.table) {
            println!("    ✗ table '{}' not found (have: {})", source.table, tables.join(", "));
            problems += 1;
            continue;
        }

        let columns = handle.source.list_columns(&source.table).await?;
        if columns.contains(&source.column) {
            println!("    ✓ columns: {}", columns.join(", "));
        } else {
            println!(
                "    ✗ column '{}' not found (have: {})",
                source.column,
                columns.join(", ")
            );
            problems += 1;
        }
    }

    if problems > 0 {
        bail!("{} source problem(s) found", problems);
    }
    println!("\n✓ Configuration OK");
    Ok(())
}
