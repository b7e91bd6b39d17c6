//! Bulk export of the full record set into interchange formats.
//!
//! One export materializes the entire `prices` table into a CSV file, an
//! XLSX workbook, and a JSON records array, all named
//! `<prefix>_<YYYY-MM-DD>.<ext>`. Re-running on the same day overwrites the
//! same-dated files; the operation is side-effecting and non-idempotent.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use thiserror::Error;
use tracing::{info, instrument};

use crate::store::{PriceRow, PriceStore, StoreError};

/// Column order shared by all three output formats.
const COLUMNS: [&str; 5] = ["id", "product_name", "price", "source", "scraped_at"];

/// The fixed set of supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExportFormat {
    /// Delimited text.
    Csv,
    /// Spreadsheet workbook.
    Xlsx,
    /// Structured records array.
    Json,
}

impl ExportFormat {
    /// All supported formats, in output order.
    pub const ALL: [Self; 3] = [Self::Csv, Self::Xlsx, Self::Json];

    /// File extension for the format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            "json" => Ok(Self::Json),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Errors that can occur during export.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The `prices` table holds zero records; nothing to export.
    #[error("price table is empty, nothing to export")]
    EmptyDataset,

    /// A format outside the fixed {csv, xlsx, json} set was requested.
    #[error("unsupported export format '{0}' (use csv, xlsx, json)")]
    UnsupportedFormat(String),

    /// Reading the record set failed.
    #[error("failed to read records for export: {0}")]
    Store(#[from] StoreError),

    /// Writing an output file failed.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// The output path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failed.
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Workbook construction or save failed.
    #[error("XLSX export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl ExportError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Exports the full record set to every supported format.
#[derive(Debug, Clone)]
pub struct Exporter {
    store: PriceStore,
}

impl Exporter {
    /// Creates an exporter over the given store.
    #[must_use]
    pub fn new(store: PriceStore) -> Self {
        Self { store }
    }

    /// Writes `<prefix>_<currentDate>.{csv,xlsx,json}` under `dir`,
    /// returning the produced path per format.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::EmptyDataset`] if there are zero records,
    /// or an IO/serialization error if writing any file fails.
    #[instrument(skip(self), fields(dir = %dir.display(), prefix))]
    pub async fn export_all(
        &self,
        dir: &Path,
        prefix: &str,
    ) -> Result<BTreeMap<ExportFormat, PathBuf>, ExportError> {
        let rows = self.store.all_rows().await?;
        if rows.is_empty() {
            return Err(ExportError::EmptyDataset);
        }

        std::fs::create_dir_all(dir).map_err(|e| ExportError::io(dir, e))?;

        let today = Local::now().format("%Y-%m-%d");
        let mut files = BTreeMap::new();

        for format in ExportFormat::ALL {
            let path = dir.join(format!("{prefix}_{today}.{}", format.extension()));
            match format {
                ExportFormat::Csv => write_csv(&path, &rows)?,
                ExportFormat::Xlsx => write_xlsx(&path, &rows)?,
                ExportFormat::Json => write_json(&path, &rows)?,
            }
            files.insert(format, path);
        }

        info!(rows = rows.len(), files = files.len(), "export complete");
        Ok(files)
    }
}

fn write_csv(path: &Path, rows: &[PriceRow]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    // PriceRow derives Serialize, so the header row comes from field names
    // and matches COLUMNS.
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| ExportError::io(path, e))?;
    Ok(())
}

fn write_xlsx(path: &Path, rows: &[PriceRow]) -> Result<(), ExportError> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, header) in COLUMNS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_number(r, 0, row.id as f64)?;
        worksheet.write_string(r, 1, &row.product_name)?;
        worksheet.write_number(r, 2, row.price)?;
        worksheet.write_string(r, 3, &row.source)?;
        worksheet.write_string(r, 4, &row.scraped_at)?;
    }

    workbook.save(path)?;
    Ok(())
}

fn write_json(path: &Path, rows: &[PriceRow]) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(rows)?;
    std::fs::write(path, json).map_err(|e| ExportError::io(path, e))?;
    Ok(())
}
