//! Sink error types

use std::time::Duration;

use kiddo_domain::KiddoError;
use thiserror::Error;

/// Failures delivering a structured event to a sink
#[derive(Debug, Error)]
pub enum SinkError {
    /// No channel registered under this name
    #[error("Channel {0} not available")]
    UnknownChannel(String),

    /// The channel rejected the recipient address
    #[error("Invalid recipient format for {channel}: {recipient}")]
    InvalidRecipient { channel: String, recipient: String },

    /// The sink reported a failure
    #[error("Delivery to {sink} failed: {reason}")]
    Delivery { sink: String, reason: String },

    /// The sink did not answer in time
    #[error("Sink {sink} timed out after {duration:?}")]
    Timeout { sink: String, duration: Duration },
}

impl SinkError {
    pub fn delivery(sink: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Delivery { sink: sink.into(), reason: reason.into() }
    }
}

impl From<SinkError> for KiddoError {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::UnknownChannel(_) => KiddoError::NotFound(err.to_string()),
            SinkError::InvalidRecipient { .. } => KiddoError::InvalidInput(err.to_string()),
            SinkError::Timeout { .. } => KiddoError::Timeout(err.to_string()),
            SinkError::Delivery { .. } => KiddoError::Sink(err.to_string()),
        }
    }
}

/// Convenience type alias for sink operations
pub type SinkResult<T> = Result<T, SinkError>;
