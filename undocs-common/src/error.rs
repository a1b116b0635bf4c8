//! Common error types for UNDOCS

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for UNDOCS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the UNDOCS crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pattern definition rejected at load time
    #[error("Invalid pattern '{name}': {reason}")]
    Pattern { name: String, reason: String },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// State or collection could not be durably written
    #[error("Persistence error at {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },

    /// Remote request failed (only surfaced by document retrieval)
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Shorthand for [`Error::Pattern`]
    pub fn pattern(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Pattern {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
