//! Database connection and schema management.
//!
//! This module provides SQLite database connectivity with:
//! - Connection pool management
//! - WAL mode for concurrent reads
//! - Idempotent schema initialization on every open
//!
//! # Example
//!
//! ```no_run
//! use pricewatch_core::Database;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(Path::new("prices.sqlite")).await?;
//! // Use db for queries...
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::instrument;

/// Default maximum number of connections in the pool.
/// Kept low for SQLite since it uses file-level locking.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in milliseconds.
/// Connections will wait this long before returning SQLITE_BUSY.
const BUSY_TIMEOUT_MS: u32 = 5000;

/// Schema for the append-only price table. Applied with `IF NOT EXISTS`
/// so re-running it on every start is safe.
const SCHEMA: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS prices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        product_name TEXT NOT NULL,
        price REAL NOT NULL,
        source TEXT NOT NULL,
        scraped_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_prices_scraped_at ON prices(scraped_at)",
    "CREATE INDEX IF NOT EXISTS idx_prices_product_name ON prices(product_name)",
];

/// Database-related errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// Failed to connect to the database or apply the schema.
    #[error("failed to connect to database: {0}")]
    Connection(#[from] sqlx::Error),

    /// The backing store does not exist at the expected path.
    ///
    /// Returned by [`Database::open_existing`] so read-side consumers
    /// (query/export commands) can report a missing store instead of
    /// silently creating an empty one.
    #[error("no price database at {}", .0.display())]
    StoreMissing(PathBuf),
}

/// Database connection wrapper with connection pool.
///
/// Handles SQLite connection pooling, WAL mode configuration,
/// and idempotent schema initialization.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Creates a new database connection to the specified path.
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Enable WAL mode for concurrent reads
    /// 3. Ensure the `prices` table and its indexes exist
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Connection`] if the connection or schema
    /// initialization fails.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn new(db_path: &Path) -> Result<Self, DbError> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect(&db_url)
            .await?;

        // Enable WAL mode for concurrent reads
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;

        // Set busy timeout to avoid immediate lock errors
        sqlx::query(&format!("PRAGMA busy_timeout={BUSY_TIMEOUT_MS}"))
            .execute(&pool)
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    /// Opens an existing database, failing if the file is not there.
    ///
    /// Query and export commands use this so a typo'd path surfaces as
    /// "no price database" rather than an empty result set.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::StoreMissing`] if no file exists at `db_path`,
    /// or [`DbError::Connection`] if the connection fails.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn open_existing(db_path: &Path) -> Result<Self, DbError> {
        if !db_path.exists() {
            return Err(DbError::StoreMissing(db_path.to_path_buf()));
        }
        Self::new(db_path).await
    }

    /// Creates an in-memory database for testing.
    ///
    /// The database exists only for the lifetime of the connection
    /// and is useful for unit tests. Note: WAL mode is not enabled
    /// for in-memory databases as it provides no benefit.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Connection`] if the connection or schema
    /// initialization fails.
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::init_schema(&pool).await?;

        Ok(Self { pool })
    }

    async fn init_schema(pool: &SqlitePool) -> Result<(), DbError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(pool).await?;
        }
        Ok(())
    }

    /// Returns a reference to the underlying connection pool.
    ///
    /// Use this for executing queries with sqlx.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Checks if WAL mode is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Connection`] if the query fails.
    #[instrument(skip(self))]
    pub async fn is_wal_enabled(&self) -> Result<bool, DbError> {
        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0.to_lowercase() == "wal")
    }

    /// Gracefully closes all connections in the pool.
    ///
    /// This should be called before the application exits. After calling
    /// this method, the Database instance should not be used.
    #[instrument(skip(self))]
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_new_in_memory_succeeds() {
        let db = Database::new_in_memory().await;
        assert!(db.is_ok(), "Failed to create in-memory database");
    }

    #[tokio::test]
    async fn test_database_schema_creates_prices_table() {
        let db = Database::new_in_memory().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO prices (product_name, price, source, scraped_at)
             VALUES ('Café Molido 500g', 1200.5, 'Café', '2025-01-01 12:00:00')",
        )
        .execute(db.pool())
        .await;

        assert!(result.is_ok(), "Prices table should exist after init");
    }

    #[tokio::test]
    async fn test_database_schema_init_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("prices.sqlite");

        let db = Database::new(&db_path).await.unwrap();
        sqlx::query(
            "INSERT INTO prices (product_name, price, source, scraped_at)
             VALUES ('Leche Entera 1L', 980.0, 'Leche', '2025-01-01 12:00:00')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        db.close().await;

        // Re-opening re-runs the schema; existing rows must survive.
        let db = Database::new(&db_path).await.unwrap();
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM prices")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_database_with_tempfile_enables_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.sqlite");

        let db = Database::new(&db_path).await.unwrap();
        let is_wal = db.is_wal_enabled().await.unwrap();
        assert!(is_wal, "WAL mode should be enabled for file-based database");
    }

    #[tokio::test]
    async fn test_database_open_existing_missing_file_errors() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("nope.sqlite");

        let result = Database::open_existing(&db_path).await;
        assert!(matches!(result, Err(DbError::StoreMissing(_))));
    }

    #[tokio::test]
    async fn test_database_open_existing_finds_created_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("prices.sqlite");

        Database::new(&db_path).await.unwrap().close().await;
        let reopened = Database::open_existing(&db_path).await;
        assert!(reopened.is_ok());
    }

    #[tokio::test]
    async fn test_database_pool_returns_valid_pool() {
        let db = Database::new_in_memory().await.unwrap();
        let result: (i64,) = sqlx::query_as("SELECT 1")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(result.0, 1);
    }
}
