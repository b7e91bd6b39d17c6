//! Per-item parsing of upstream catalog JSON into normalized price records.
//!
//! Each upstream shape gets its own [`ItemParser`] implementation; the
//! [`ParserRegistry`] selects one per source so new catalog shapes can be
//! added without touching the pipeline loop.
//!
//! Parsing is defensive: a missing key, wrong type, out-of-range index, or
//! failed numeric coercion rejects that one item (returns `None`) and never
//! raises. A bad item must never abort the rest of its batch.

mod vtex;

pub use vtex::VtexCatalogParser;

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

/// Timestamp format stored in `scraped_at`. Lexicographic order matches
/// chronological order, which the date-prefix filter and sorting rely on.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current UTC time in the stored timestamp format.
#[must_use]
pub fn utc_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// A normalized price observation, immutable once created.
///
/// Identity is assigned by the store on append; repeated scrapes of the
/// same product create new records (time series, not a latest-value table).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    /// Upstream-provided display name, non-empty.
    pub product_name: String,
    /// Finite, non-negative price after coercion.
    pub price: f64,
    /// Category/site identifier the record was collected under.
    pub source: String,
    /// UTC timestamp stamped at parse time ([`TIMESTAMP_FORMAT`]).
    pub scraped_at: String,
}

/// Converts one raw upstream item into a normalized record.
pub trait ItemParser: Send + Sync {
    /// Returns the parser's name (e.g., "vtex").
    fn name(&self) -> &str;

    /// Parses a single raw item collected under `category`.
    ///
    /// Returns `None` for incomplete or malformed items; never panics on
    /// upstream data.
    fn parse_item(&self, item: &Value, category: &str) -> Option<PriceRecord>;
}

/// Source-keyed parser selection with a default for unmapped sources.
pub struct ParserRegistry {
    by_source: HashMap<String, Box<dyn ItemParser>>,
    default: Box<dyn ItemParser>,
}

impl ParserRegistry {
    /// Creates a registry that falls back to `default` for unmapped sources.
    #[must_use]
    pub fn with_default(default: Box<dyn ItemParser>) -> Self {
        Self {
            by_source: HashMap::new(),
            default,
        }
    }

    /// Maps a source to a dedicated parser, replacing any previous mapping.
    pub fn register(&mut self, source: impl Into<String>, parser: Box<dyn ItemParser>) {
        self.by_source.insert(source.into(), parser);
    }

    /// Returns the parser responsible for `source`.
    #[must_use]
    pub fn for_source(&self, source: &str) -> &dyn ItemParser {
        self.by_source
            .get(source)
            .map_or(self.default.as_ref(), |parser| parser.as_ref())
    }
}

/// Builds the default registry used by pipeline runs: every reference
/// category serves the VTEX catalog shape.
#[must_use]
pub fn build_default_parser_registry() -> ParserRegistry {
    ParserRegistry::with_default(Box::new(VtexCatalogParser::new()))
}
