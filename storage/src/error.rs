//! Storage error types.
//!
//! Used by the context, queries and repositories. Storage-layer faults are passed through
//! unchanged; nothing here retries.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when using storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Not found: {collection}/{id}")]
    NotFound { collection: &'static str, id: Uuid },
    /// A staged update or removal matched no row at commit time.
    #[error("Concurrency conflict: {collection}/{id} was changed or removed before commit")]
    Conflict { collection: &'static str, id: Uuid },
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Operation cancelled")]
    Cancelled,
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StorageError::Cancelled)
    }
}
