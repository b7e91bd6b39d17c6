//! Append-only persistence of price records and read queries over them.
//!
//! The `prices` table is a time series: every scrape appends new rows, no
//! row is ever updated or deleted, and duplicates across runs are expected.
//! Identity is the auto-assigned surrogate key; no natural key is enforced.
//!
//! # Example
//!
//! ```ignore
//! use pricewatch_core::store::{PriceStore, PriceQuery};
//! use pricewatch_core::Database;
//!
//! let store = PriceStore::new(Database::new_in_memory().await?);
//! store.append(&records).await?;
//! let newest = store.latest(20).await?;
//! ```

mod error;

pub use error::StoreError;

use serde::Serialize;
use sqlx::FromRow;
use tracing::instrument;

use crate::db::Database;
use crate::parser::PriceRecord;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// A persisted price record, as read back from the store.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct PriceRow {
    /// Surrogate key, auto-assigned on append.
    pub id: i64,
    /// Product display name.
    pub product_name: String,
    /// Observed price.
    pub price: f64,
    /// Category the record was collected under.
    pub source: String,
    /// UTC timestamp text, `YYYY-MM-DD HH:MM:SS`.
    pub scraped_at: String,
}

/// One point in a product's price history.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct PricePoint {
    /// When the price was observed.
    pub scraped_at: String,
    /// The observed price.
    pub price: f64,
}

/// Optional filters for [`PriceStore::query`]. All default to "no filter".
#[derive(Debug, Clone, Default)]
pub struct PriceQuery {
    /// Substring match on product name (store `LIKE` semantics).
    pub product: Option<String>,
    /// Exact match on source.
    pub source: Option<String>,
    /// Prefix match on the stored timestamp text (e.g. `2025-01-15`).
    pub date: Option<String>,
}

/// Store for the append-only `prices` table.
#[derive(Debug, Clone)]
pub struct PriceStore {
    db: Database,
}

impl PriceStore {
    /// Creates a store over an initialized database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Appends a batch of records as one transaction.
    ///
    /// Every record is validated first; a single invalid record rejects the
    /// whole batch, since malformed records indicate a pipeline defect.
    /// Duplicates of existing rows are permitted by design.
    ///
    /// Returns the number of rows inserted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] on a malformed record, or
    /// [`StoreError::Database`] if the insert fails.
    #[instrument(skip(self, records), fields(batch = records.len()))]
    pub async fn append(&self, records: &[PriceRecord]) -> Result<u64> {
        for record in records {
            validate_record(record)?;
        }

        let mut tx = self.db.pool().begin().await?;
        for record in records {
            sqlx::query(
                r"INSERT INTO prices (product_name, price, source, scraped_at)
                  VALUES (?, ?, ?, ?)",
            )
            .bind(&record.product_name)
            .bind(record.price)
            .bind(&record.source)
            .bind(&record.scraped_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(records.len() as u64)
    }

    /// Lists records matching the filters, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn query(&self, filters: &PriceQuery) -> Result<Vec<PriceRow>> {
        let mut sql = String::from("SELECT * FROM prices WHERE 1=1");
        if filters.product.is_some() {
            sql.push_str(" AND product_name LIKE ?");
        }
        if filters.source.is_some() {
            sql.push_str(" AND source = ?");
        }
        if filters.date.is_some() {
            sql.push_str(" AND scraped_at LIKE ?");
        }
        sql.push_str(" ORDER BY scraped_at DESC, id DESC");

        let mut query = sqlx::query_as::<_, PriceRow>(&sql);
        if let Some(product) = &filters.product {
            query = query.bind(format!("%{product}%"));
        }
        if let Some(source) = &filters.source {
            query = query.bind(source);
        }
        if let Some(date) = &filters.date {
            query = query.bind(format!("{date}%"));
        }

        Ok(query.fetch_all(self.db.pool()).await?)
    }

    /// Returns the `n` most recent records, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn latest(&self, n: i64) -> Result<Vec<PriceRow>> {
        let rows = sqlx::query_as::<_, PriceRow>(
            "SELECT * FROM prices ORDER BY scraped_at DESC, id DESC LIMIT ?",
        )
        .bind(n)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows)
    }

    /// Returns the full ascending time series for one exact product name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self), fields(product = %product_name))]
    pub async fn history(&self, product_name: &str) -> Result<Vec<PricePoint>> {
        let points = sqlx::query_as::<_, PricePoint>(
            r"SELECT scraped_at, price FROM prices
              WHERE product_name = ?
              ORDER BY scraped_at ASC, id ASC",
        )
        .bind(product_name)
        .fetch_all(self.db.pool())
        .await?;

        Ok(points)
    }

    /// Reads the entire record set in insertion order (for export).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn all_rows(&self) -> Result<Vec<PriceRow>> {
        let rows = sqlx::query_as::<_, PriceRow>("SELECT * FROM prices ORDER BY id ASC")
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows)
    }

    /// Total number of persisted records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM prices")
            .fetch_one(self.db.pool())
            .await?;

        Ok(count.0)
    }
}

/// Checks that a record carries all four required fields with usable values.
fn validate_record(record: &PriceRecord) -> Result<()> {
    if record.product_name.trim().is_empty() {
        return Err(StoreError::validation("product_name is empty"));
    }
    if record.source.trim().is_empty() {
        return Err(StoreError::validation("source is empty"));
    }
    if !record.price.is_finite() || record.price < 0.0 {
        return Err(StoreError::validation(format!(
            "price {} is not a finite non-negative number",
            record.price
        )));
    }
    if record.scraped_at.trim().is_empty() {
        return Err(StoreError::validation("scraped_at is empty"));
    }
    Ok(())
}
