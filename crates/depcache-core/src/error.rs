//! Error types for Depcache Core

use crate::limits::ValidationError;
use thiserror::Error;

/// Result type alias using Depcache's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Depcache error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Item source error: {0}")]
    ItemSource(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
