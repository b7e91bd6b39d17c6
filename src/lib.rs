//! Pricewatch Core Library
//!
//! This library tracks supermarket prices over time: it scrapes an upstream
//! catalog API per category, normalizes items into price records, persists
//! them as an append-only time series, and exposes query and bulk-export
//! surfaces over the accumulated history.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`db`] - Database connection and schema management
//! - [`fetch`] - HTTP transport with retries, browser-identity headers,
//!   proxy indirection, and block detection
//! - [`parser`] - Per-source item parsing into normalized records
//! - [`pipeline`] - Sequential fetch→parse→persist orchestration
//! - [`store`] - Append-only persistence and read queries
//! - [`export`] - Bulk export to CSV/XLSX/JSON
//! - [`config`] - Run configuration passed explicitly into components

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

pub mod config;
pub mod db;
pub mod export;
pub mod fetch;
pub mod parser;
pub mod pipeline;
pub mod store;

// Re-export commonly used types
pub use config::{DEFAULT_DB_PATH, DEFAULT_EXPORT_DIR, DEFAULT_EXPORT_PREFIX, PipelineConfig};
pub use db::{Database, DbError};
pub use export::{ExportError, ExportFormat, Exporter};
pub use fetch::{
    CategoryFetcher, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECS, FetchOutcome, HttpFetcher,
    HttpSession, RetryDecision, RetryPolicy,
};
pub use parser::{ItemParser, ParserRegistry, PriceRecord, build_default_parser_registry};
pub use pipeline::{CategoryTarget, Pipeline, RunStats};
pub use store::{PricePoint, PriceQuery, PriceRow, PriceStore, StoreError};
