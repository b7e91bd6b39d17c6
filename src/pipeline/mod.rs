//! Pipeline orchestration: fetch every tracked category, parse, persist.
//!
//! Categories are processed sequentially in configured order. A category
//! whose fetch is blocked, times out, or returns garbage contributes zero
//! records and the run moves on; partial results are preferable to total
//! failure. Only storage-level failures abort the run, since they indicate
//! a defect rather than an upstream condition.

use tracing::{info, instrument, warn};

use crate::fetch::{CategoryFetcher, FetchOutcome};
use crate::parser::{ParserRegistry, PriceRecord};
use crate::store::{self, PriceStore};

/// A named upstream source: one category mapped to one endpoint.
///
/// Configuration, not persisted; owned by the pipeline for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTarget {
    /// Category/source identifier (e.g. "Café").
    pub category: String,
    /// Upstream listing endpoint for the category.
    pub url: String,
}

impl CategoryTarget {
    /// Creates a new target.
    #[must_use]
    pub fn new(category: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            url: url.into(),
        }
    }
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Records accepted by the parser across all categories.
    pub collected: usize,
    /// Raw items dropped by per-item parse rejection.
    pub rejected: usize,
    /// Categories that contributed zero records due to fetch failure.
    pub failed_categories: usize,
    /// Records actually persisted by the batch append.
    pub persisted: usize,
}

/// Sequential fetch→parse→persist pipeline over configured categories.
pub struct Pipeline {
    fetcher: Box<dyn CategoryFetcher>,
    parsers: ParserRegistry,
}

impl Pipeline {
    /// Creates a pipeline from a fetcher and a parser registry.
    #[must_use]
    pub fn new(fetcher: Box<dyn CategoryFetcher>, parsers: ParserRegistry) -> Self {
        Self { fetcher, parsers }
    }

    /// Fetches and parses all targets, returning accepted records in
    /// category order, then within-category upstream order.
    ///
    /// Fetch failures are absorbed per category and logged; this method
    /// itself never fails.
    #[instrument(skip(self, targets), fields(targets = targets.len()))]
    pub async fn run(&self, targets: &[CategoryTarget]) -> (Vec<PriceRecord>, RunStats) {
        let mut records = Vec::new();
        let mut stats = RunStats::default();

        for target in targets {
            info!(category = %target.category, "fetching category");

            match self.fetcher.fetch(&target.category, &target.url).await {
                FetchOutcome::Ok(items) => {
                    let parser = self.parsers.for_source(&target.category);
                    let before = records.len();
                    let mut rejected = 0_usize;
                    for item in &items {
                        match parser.parse_item(item, &target.category) {
                            Some(record) => records.push(record),
                            None => rejected += 1,
                        }
                    }
                    let accepted = records.len() - before;
                    info!(
                        category = %target.category,
                        accepted,
                        rejected,
                        "parsed category listing"
                    );
                    stats.rejected += rejected;
                }
                FetchOutcome::Blocked { preview } => {
                    warn!(
                        category = %target.category,
                        preview = %preview,
                        "upstream returned non-JSON body (blocked), skipping category"
                    );
                    stats.failed_categories += 1;
                }
                FetchOutcome::TransportError { cause } => {
                    warn!(
                        category = %target.category,
                        cause = %cause,
                        "transport failure, skipping category"
                    );
                    stats.failed_categories += 1;
                }
                FetchOutcome::DecodeError { cause } => {
                    warn!(
                        category = %target.category,
                        cause = %cause,
                        "malformed JSON payload, skipping category"
                    );
                    stats.failed_categories += 1;
                }
            }
        }

        stats.collected = records.len();
        (records, stats)
    }

    /// Runs the pipeline and appends the aggregate to the store as one batch.
    ///
    /// An empty aggregate is "no data", not an error; nothing is appended
    /// and the stats report zero persisted records.
    ///
    /// # Errors
    ///
    /// Returns [`store::StoreError`] if the batch append fails; this aborts
    /// the run since it indicates a pipeline or storage defect.
    #[instrument(skip(self, targets, store))]
    pub async fn run_and_store(
        &self,
        targets: &[CategoryTarget],
        store: &PriceStore,
    ) -> store::Result<RunStats> {
        let (records, mut stats) = self.run(targets).await;

        if records.is_empty() {
            info!("no data collected this run, nothing to persist");
            return Ok(stats);
        }

        let persisted = store.append(&records).await?;
        stats.persisted = persisted as usize;
        info!(
            persisted,
            rejected = stats.rejected,
            failed_categories = stats.failed_categories,
            "pipeline run complete"
        );

        Ok(stats)
    }
}
