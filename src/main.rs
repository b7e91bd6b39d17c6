//! CLI entry point for the pricewatch tool.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::Parser;
use pricewatch_core::{
    Database, ExportFormat, Exporter, HttpFetcher, HttpSession, Pipeline, PipelineConfig,
    PriceQuery, PriceStore, RetryPolicy, build_default_parser_registry,
};
use serde::Serialize;
use tracing::{debug, info};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
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

    // Logs go to stderr; stdout carries query/export results.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    match args.command {
        Command::Scrape { timeout } => scrape(&args.db, timeout).await,
        Command::Query {
            product,
            source,
            date,
        } => {
            let store = open_store(&args.db).await?;
            let rows = store
                .query(&PriceQuery {
                    product,
                    source,
                    date,
                })
                .await?;
            print_json(&rows)
        }
        Command::Latest { count } => {
            let store = open_store(&args.db).await?;
            let rows = store.latest(count).await?;
            print_json(&rows)
        }
        Command::History { product } => {
            let store = open_store(&args.db).await?;
            let points = store.history(&product).await?;
            print_json(&points)
        }
        Command::Export {
            format,
            dir,
            prefix,
        } => {
            // Reject an unknown format before touching the filesystem.
            let selected = format
                .as_deref()
                .map(ExportFormat::from_str)
                .transpose()?;

            let store = open_store(&args.db).await?;
            let files = Exporter::new(store).export_all(&dir, &prefix).await?;

            match selected {
                Some(format) => {
                    if let Some(path) = files.get(&format) {
                        println!("{}", path.display());
                    }
                }
                None => {
                    for (format, path) in &files {
                        println!("{format}: {}", path.display());
                    }
                }
            }
            Ok(())
        }
    }
}

/// Runs one scrape pipeline over the configured categories.
async fn scrape(db_path: &Path, timeout_secs: u64) -> Result<()> {
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
    }

    let config = PipelineConfig::from_env(db_path.to_path_buf(), timeout_secs);
    info!(
        categories = config.targets.len(),
        proxy = config.proxy_key.is_some(),
        timeout_secs,
        "starting scrape run"
    );

    let db = Database::new(&config.db_path).await?;
    let store = PriceStore::new(db);

    let session = HttpSession::new(config.proxy_key.clone(), config.timeout)
        .context("building HTTP session")?;
    let fetcher = HttpFetcher::new(session, RetryPolicy::default());
    let pipeline = Pipeline::new(Box::new(fetcher), build_default_parser_registry());

    let stats = pipeline.run_and_store(&config.targets, &store).await?;

    // The run always reports how many records were persisted, even zero.
    println!(
        "persisted {} records ({} rejected items, {} failed categories)",
        stats.persisted, stats.rejected, stats.failed_categories
    );

    Ok(())
}

/// Opens the store for read-side commands, failing if the database is missing.
async fn open_store(db_path: &Path) -> Result<PriceStore> {
    let db = Database::open_existing(db_path).await?;
    Ok(PriceStore::new(db))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
