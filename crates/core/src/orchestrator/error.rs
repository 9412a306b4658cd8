//! Orchestrator error types

use std::time::Duration;

use kiddo_domain::KiddoError;
use thiserror::Error;

/// Orchestrator-specific errors
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Orchestrator is already running
    #[error("Orchestrator already running")]
    AlreadyRunning,

    /// Orchestrator is not running
    #[error("Orchestrator not running")]
    NotRunning,

    /// Two connectors claim the same source id
    #[error("Duplicate connector source_id: {0}")]
    DuplicateSource(String),

    /// Operation timed out
    #[error("{operation} timed out after {duration:?}")]
    Timeout { operation: &'static str, duration: Duration },

    /// Task join failed
    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<OrchestratorError> for KiddoError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::AlreadyRunning
            | OrchestratorError::NotRunning
            | OrchestratorError::DuplicateSource(_) => KiddoError::InvalidInput(err.to_string()),
            OrchestratorError::Timeout { .. } => KiddoError::Timeout(err.to_string()),
            OrchestratorError::TaskJoinFailed(_) => KiddoError::Internal(err.to_string()),
        }
    }
}

/// Convenience type alias for orchestrator operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
