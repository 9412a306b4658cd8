//! Orchestrator timing configuration

use std::time::Duration;

use kiddo_domain::constants::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_CONSUME_BACKOFF_SECS, DEFAULT_DISCONNECT_TIMEOUT_SECS,
    DEFAULT_EXTRACTION_TIMEOUT_SECS, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_INGEST_BACKOFF_SECS,
    DEFAULT_MARK_TIMEOUT_SECS, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
use kiddo_domain::PipelineConfig;

/// Configuration for the orchestrator loops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Pause before re-fetching after a connector pass ends or fails
    pub ingest_backoff: Duration,
    /// Pause after a queue fault before consuming again
    pub consume_backoff: Duration,
    pub connect_timeout: Option<Duration>,
    /// Bound on waiting for each item of a connector fetch
    pub fetch_timeout: Option<Duration>,
    pub extraction_timeout: Option<Duration>,
    /// Bound on idempotency checks and marking
    pub mark_timeout: Option<Duration>,
    /// Grace period for loops to exit on stop before they are aborted
    pub shutdown_timeout: Duration,
    pub disconnect_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            ingest_backoff: Duration::from_secs(DEFAULT_INGEST_BACKOFF_SECS),
            consume_backoff: Duration::from_secs(DEFAULT_CONSUME_BACKOFF_SECS),
            connect_timeout: Some(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
            fetch_timeout: Some(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS)),
            extraction_timeout: Some(Duration::from_secs(DEFAULT_EXTRACTION_TIMEOUT_SECS)),
            mark_timeout: Some(Duration::from_secs(DEFAULT_MARK_TIMEOUT_SECS)),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            disconnect_timeout: Duration::from_secs(DEFAULT_DISCONNECT_TIMEOUT_SECS),
        }
    }
}

impl From<&PipelineConfig> for OrchestratorConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            ingest_backoff: Duration::from_secs(config.ingest_backoff_secs),
            consume_backoff: Duration::from_secs(config.consume_backoff_secs),
            fetch_timeout: config.fetch_timeout_secs.map(Duration::from_secs),
            extraction_timeout: config.extraction_timeout_secs.map(Duration::from_secs),
            mark_timeout: config.mark_timeout_secs.map(Duration::from_secs),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
            ..Self::default()
        }
    }
}
