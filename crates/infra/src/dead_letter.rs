//! Dead-letter sinks for events that exhausted their redeliveries

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use kiddo_core::DeadLetterSink;
use kiddo_domain::{DeadLetterConfig, RawEvent, Result};
use serde_json::json;
use tracing::error;

use crate::jsonl::JsonlWriter;

/// Reports dead letters in the log only
#[derive(Debug, Default)]
pub struct LogDeadLetterSink;

#[async_trait]
impl DeadLetterSink for LogDeadLetterSink {
    async fn deliver(&self, event: &RawEvent, reason: &str) -> Result<()> {
        error!(
            event_id = %event.display_id(),
            source_id = %event.source_id,
            reason,
            "Event dead-lettered"
        );
        Ok(())
    }
}

/// Appends dead letters, with the full raw event, to a JSON lines file
pub struct JsonlDeadLetterSink {
    writer: JsonlWriter,
}

impl JsonlDeadLetterSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { writer: JsonlWriter::new(path) }
    }
}

#[async_trait]
impl DeadLetterSink for JsonlDeadLetterSink {
    async fn deliver(&self, event: &RawEvent, reason: &str) -> Result<()> {
        self.writer
            .append(&json!({
                "dead_lettered_at": Utc::now(),
                "reason": reason,
                "event": event,
            }))
            .await
    }
}

pub fn build_dead_letter_sink(config: &DeadLetterConfig) -> Arc<dyn DeadLetterSink> {
    match config {
        DeadLetterConfig::Log => Arc::new(LogDeadLetterSink),
        DeadLetterConfig::Jsonl { path } => Arc::new(JsonlDeadLetterSink::new(path.clone())),
    }
}
