//! Error types for FIP

use thiserror::Error;

/// Result type alias for FIP operations
pub type Result<T> = std::result::Result<T, FipError>;

/// Main error type for FIP
#[derive(Error, Debug)]
pub enum FipError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Staging artifact error: {0}")]
    Staging(String),
}
