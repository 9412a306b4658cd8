//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Kiddo
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum KiddoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connector error: {0}")]
    Connector(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for KiddoError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for KiddoError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(format!("JSON: {err}"))
    }
}

/// Result type alias for Kiddo operations
pub type Result<T> = std::result::Result<T, KiddoError>;
