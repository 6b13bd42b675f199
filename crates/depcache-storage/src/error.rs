//! Storage error types

use thiserror::Error;

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Storage-specific error types
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Corrupt cache: {0}")]
    CorruptCache(String),

    #[error("Too many {what} for the cache format: {count} (max {max})")]
    FormatLimitExceeded {
        what: &'static str,
        count: usize,
        max: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Core error: {0}")]
    Core(#[from] depcache_core::Error),

    #[error("Failed to replace cache file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Background write failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Lock error: {0}")]
    Lock(String),
}
