use std::time::Duration;

use thiserror::Error;

use crate::error::{CommonError, ErrorSeverity};
use crate::impl_error_classification;

/// Why a publish or queue construction failed.
///
/// Ack and nack never fail; unknown ids surface through their outcome types.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Rejected `QueueConfig`
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Backlog plus in-flight items reached `max_capacity` under
    /// `OverflowPolicy::Reject`
    #[error("Queue is at maximum capacity ({0})")]
    CapacityExceeded(usize),

    #[error("Queue is shutting down")]
    ShuttingDown,

    #[error("Invalid queue state: {0}")]
    InvalidState(String),
}

impl_error_classification!(QueueError, Common,
    Self::CapacityExceeded(_) => {
        retryable: true,
        severity: ErrorSeverity::Warning,
        critical: false,
        retry_after: Some(Duration::from_millis(100)),
    },
    Self::ShuttingDown => {
        retryable: false,
        severity: ErrorSeverity::Info,
        critical: false,
    },
    Self::InvalidState(_) => {
        retryable: false,
        severity: ErrorSeverity::Critical,
        critical: true,
    }
);

/// Queue operation result type
pub type QueueResult<T> = Result<T, QueueError>;
