//! Common error types for bean-lens

use thiserror::Error;

/// Common result type for bean-lens operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across bean-lens crates
///
/// An unmatched attribute value is never an error; only construction-time
/// failures and caller mistakes are represented here.
#[derive(Error, Debug)]
pub enum Error {
    /// Dictionary snapshot for the requested version is missing or unreadable
    #[error("Dictionary not found: {0}")]
    DictionaryNotFound(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
