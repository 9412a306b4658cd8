//! Pipeline orchestration: connector lifecycles, ingestion and processing
//! loops, and the ack/nack protocol around each event.

mod config;
mod error;
mod metrics;
mod registry;
mod service;

pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, OrchestratorResult};
pub use metrics::{PipelineMetrics, PipelineMetricsSnapshot};
pub use registry::ConnectorRegistry;
pub use service::Orchestrator;
