//! Error types for Gov-Hub

use thiserror::Error;

/// Result type alias for Gov-Hub operations
pub type Result<T> = std::result::Result<T, GovError>;

/// Main error type for Gov-Hub
#[derive(Error, Debug)]
pub enum GovError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
