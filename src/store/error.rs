//! Error types for price store operations.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A record in an append batch failed validation.
    ///
    /// Indicates a pipeline defect rather than an upstream condition, so
    /// the whole batch is rejected and the run should halt.
    #[error("invalid price record: {reason}")]
    Validation {
        /// What was wrong with the record.
        reason: String,
    },

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Creates a validation error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }
}
