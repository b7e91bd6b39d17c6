//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pricewatch_core::{DEFAULT_DB_PATH, DEFAULT_EXPORT_DIR, DEFAULT_EXPORT_PREFIX};

/// Track supermarket prices over time.
///
/// Pricewatch scrapes catalog listings per category, stores every observed
/// price as a new row, and answers queries and exports over the history.
#[derive(Parser, Debug)]
#[command(name = "pricewatch")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to the price database
    #[arg(long, default_value = DEFAULT_DB_PATH, global = true)]
    pub db: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the scrape pipeline over the configured categories
    Scrape {
        /// Per-request timeout in seconds (1-300)
        #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u64).range(1..=300))]
        timeout: u64,
    },

    /// List stored prices, newest first, with optional filters
    Query {
        /// Substring match on product name
        #[arg(long)]
        product: Option<String>,

        /// Exact match on source/category
        #[arg(long)]
        source: Option<String>,

        /// Date prefix match on scraped_at (e.g. 2025-01-15)
        #[arg(long)]
        date: Option<String>,
    },

    /// Show the most recent records
    Latest {
        /// How many records to show (1-1000)
        #[arg(short = 'n', long, default_value_t = 20, value_parser = clap::value_parser!(i64).range(1..=1000))]
        count: i64,
    },

    /// Show the full ascending price history for one exact product name
    History {
        /// Exact product name
        product: String,
    },

    /// Export the full table to csv, xlsx and json files
    Export {
        /// Report only this format's file (csv, xlsx, json); all three are written
        #[arg(short, long)]
        format: Option<String>,

        /// Destination directory
        #[arg(long, default_value = DEFAULT_EXPORT_DIR)]
        dir: PathBuf,

        /// Filename prefix
        #[arg(long, default_value = DEFAULT_EXPORT_PREFIX)]
        prefix: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_scrape_defaults() {
        let args = Args::try_parse_from(["pricewatch", "scrape"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.db, PathBuf::from(DEFAULT_DB_PATH));
        match args.command {
            Command::Scrape { timeout } => assert_eq!(timeout, 20),
            other => panic!("expected scrape, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_latest_default_count_is_20() {
        let args = Args::try_parse_from(["pricewatch", "latest"]).unwrap();
        match args.command {
            Command::Latest { count } => assert_eq!(count, 20),
            other => panic!("expected latest, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_query_filters_are_optional() {
        let args =
            Args::try_parse_from(["pricewatch", "query", "--product", "café", "--date", "2025-01"])
                .unwrap();
        match args.command {
            Command::Query {
                product,
                source,
                date,
            } => {
                assert_eq!(product.as_deref(), Some("café"));
                assert!(source.is_none());
                assert_eq!(date.as_deref(), Some("2025-01"));
            }
            other => panic!("expected query, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_export_accepts_format_and_dir() {
        let args = Args::try_parse_from([
            "pricewatch", "export", "--format", "xlsx", "--dir", "/tmp/out",
        ])
        .unwrap();
        match args.command {
            Command::Export {
                format,
                dir,
                prefix,
            } => {
                assert_eq!(format.as_deref(), Some("xlsx"));
                assert_eq!(dir, PathBuf::from("/tmp/out"));
                assert_eq!(prefix, DEFAULT_EXPORT_PREFIX);
            }
            other => panic!("expected export, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["pricewatch", "-vv", "scrape"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let result = Args::try_parse_from(["pricewatch", "--help"]);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
