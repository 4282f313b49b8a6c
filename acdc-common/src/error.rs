//! Common error types for AC/DC

use thiserror::Error;

/// Common result type for AC/DC operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the AC/DC crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed entity, property or statement identifier
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    /// Invalid user input (plan files, statement syntax)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
