//! Extraction error types

use std::time::Duration;

use kiddo_domain::KiddoError;
use thiserror::Error;

/// Failures turning a raw event into a structured event
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// A field the structured event cannot do without
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A field was present but unusable
    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// The analyzer failed to produce fields
    #[error("Analyzer failed: {0}")]
    Analyzer(String),

    /// Extraction did not finish in time
    #[error("Extraction timed out after {0:?}")]
    Timeout(Duration),
}

impl ExtractionError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField { field, reason: reason.into() }
    }
}

impl From<KiddoError> for ExtractionError {
    fn from(err: KiddoError) -> Self {
        match err {
            KiddoError::InvalidInput(reason) => Self::InvalidField { field: "event", reason },
            other => Self::Analyzer(other.to_string()),
        }
    }
}

impl From<ExtractionError> for KiddoError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Timeout(_) => KiddoError::Timeout(err.to_string()),
            _ => KiddoError::Extraction(err.to_string()),
        }
    }
}

/// Convenience type alias for extraction operations
pub type ExtractionResult<T> = Result<T, ExtractionError>;
