//! # Kiddo Core
//!
//! Pipeline logic with no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for sources, the event queue, extraction and
//!   sinks
//! - The extraction pipeline (normalizer, analyzer, extractor)
//! - Sink fan-out and the notification engine
//! - The orchestrator that wires connectors, queue, extraction and sinks
//!
//! ## Architecture Principles
//! - Only depends on `kiddo-common` and `kiddo-domain`
//! - No filesystem, network or platform code
//! - All external collaborators via traits

pub mod delivery;
pub mod ingestion;
pub mod orchestrator;
pub mod processing;
pub mod queue;

// Re-export specific items to avoid ambiguity
pub use delivery::ports::{CalendarSink, DeadLetterSink, NotificationChannel};
pub use delivery::{
    render_sms_summary, FanoutReport, NotificationEngine, Recipient, SinkError, SinkFanout,
    SMS_MAX_LENGTH,
};
pub use ingestion::ports::{EventStream, SourceConnector};
pub use orchestrator::{
    ConnectorRegistry, Orchestrator, OrchestratorConfig, OrchestratorError, PipelineMetrics,
    PipelineMetricsSnapshot,
};
pub use processing::ports::{EventAnalyzer, ExtractionPipeline};
pub use processing::{
    DataExtractor, EventNormalizer, ExtractedFields, ExtractionError, HeuristicAnalyzer,
    NormalizedEvent, ProcessingEngine,
};
pub use queue::ports::EventQueue;
