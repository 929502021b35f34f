//! Error types for ZQLZ

use thiserror::Error;

/// Core error type for ZQLZ operations
#[derive(Error, Debug)]
pub enum ZqlzError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Binding error: {0}")]
    Binding(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

impl From<minijinja::Error> for ZqlzError {
    fn from(err: minijinja::Error) -> Self {
        ZqlzError::Template(err.to_string())
    }
}

/// Result type alias for ZQLZ operations
pub type Result<T> = std::result::Result<T, ZqlzError>;
