//! Run configuration: tracked categories, proxy credential, timeouts, paths.
//!
//! Everything here is read once at run start and passed explicitly into the
//! components that need it; no component reads ambient process state, which
//! keeps the pipeline testable with fake transports and in-memory stores.

use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::DEFAULT_TIMEOUT_SECS;
use crate::pipeline::CategoryTarget;

/// Environment variable holding the optional proxy credential.
pub const PROXY_KEY_ENV: &str = "SCRAPER_API_KEY";

/// Default location of the price database.
pub const DEFAULT_DB_PATH: &str = "data/prices.sqlite";

/// Default directory for export files.
pub const DEFAULT_EXPORT_DIR: &str = "exports";

/// Default filename prefix for export files.
pub const DEFAULT_EXPORT_PREFIX: &str = "carrefour";

/// The three reference categories against the Carrefour AR catalog API.
#[must_use]
pub fn default_targets() -> Vec<CategoryTarget> {
    const BASE: &str = "https://www.carrefour.com.ar/api/catalog_system/pub/products/search";
    vec![
        CategoryTarget::new("Café", format!("{BASE}/cafe")),
        CategoryTarget::new("Leche", format!("{BASE}/leche")),
        CategoryTarget::new("Azúcar", format!("{BASE}/azucar")),
    ]
}

/// Resolved configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Category→endpoint map, fetched in this order.
    pub targets: Vec<CategoryTarget>,
    /// Optional proxy credential; read once at construction.
    pub proxy_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Storage location.
    pub db_path: PathBuf,
}

impl PipelineConfig {
    /// Builds the default run configuration, reading the proxy credential
    /// from [`PROXY_KEY_ENV`] (empty values count as unset).
    #[must_use]
    pub fn from_env(db_path: PathBuf, timeout_secs: u64) -> Self {
        let proxy_key = std::env::var(PROXY_KEY_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Self {
            targets: default_targets(),
            proxy_key,
            timeout: Duration::from_secs(timeout_secs),
            db_path,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            proxy_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}
