use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};

/// Pipeline counters shared by the ingestion and processing loops
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    pub ingested: AtomicU64,
    pub duplicates: AtomicU64,
    pub processed: AtomicU64,
    pub already_processed: AtomicU64,
    pub extraction_failures: AtomicU64,
    pub sink_failures: AtomicU64,
    pub mark_failures: AtomicU64,
    pub dead_lettered: AtomicU64,
    pub ingest_faults: AtomicU64,
    pub consume_faults: AtomicU64,
    pub connect_failures: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ingested(&self) {
        self.ingested.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Publish ignored because the event was already queued or in flight
    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Acked without processing because the connector had already marked it
    pub fn record_already_processed(&self) {
        self.already_processed.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub fn record_extraction_failure(&self) {
        self.extraction_failures.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub fn record_sink_failures(&self, count: usize) {
        self.sink_failures.fetch_add(count as u64, AtomicOrdering::Relaxed);
    }

    pub fn record_mark_failure(&self) {
        self.mark_failures.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub fn record_dead_letter(&self) {
        self.dead_lettered.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub fn record_ingest_fault(&self) {
        self.ingest_faults.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub fn record_consume_fault(&self) {
        self.consume_faults.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Get a snapshot of metrics
    pub fn snapshot(&self) -> PipelineMetricsSnapshot {
        PipelineMetricsSnapshot {
            ingested: self.ingested.load(AtomicOrdering::Relaxed),
            duplicates: self.duplicates.load(AtomicOrdering::Relaxed),
            processed: self.processed.load(AtomicOrdering::Relaxed),
            already_processed: self.already_processed.load(AtomicOrdering::Relaxed),
            extraction_failures: self.extraction_failures.load(AtomicOrdering::Relaxed),
            sink_failures: self.sink_failures.load(AtomicOrdering::Relaxed),
            mark_failures: self.mark_failures.load(AtomicOrdering::Relaxed),
            dead_lettered: self.dead_lettered.load(AtomicOrdering::Relaxed),
            ingest_faults: self.ingest_faults.load(AtomicOrdering::Relaxed),
            consume_faults: self.consume_faults.load(AtomicOrdering::Relaxed),
            connect_failures: self.connect_failures.load(AtomicOrdering::Relaxed),
        }
    }
}

/// Immutable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineMetricsSnapshot {
    pub ingested: u64,
    pub duplicates: u64,
    pub processed: u64,
    pub already_processed: u64,
    pub extraction_failures: u64,
    pub sink_failures: u64,
    pub mark_failures: u64,
    pub dead_lettered: u64,
    pub ingest_faults: u64,
    pub consume_faults: u64,
    pub connect_failures: u64,
}

impl PipelineMetricsSnapshot {
    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Pipeline Metrics:\n\
            - Ingested: {} (duplicates {})\n\
            - Processed: {} (already processed {})\n\
            - Failures: extraction {}, sinks {}, marking {}\n\
            - Dead-lettered: {}\n\
            - Faults: ingest {}, consume {}, connect {}",
            self.ingested,
            self.duplicates,
            self.processed,
            self.already_processed,
            self.extraction_failures,
            self.sink_failures,
            self.mark_failures,
            self.dead_lettered,
            self.ingest_faults,
            self.consume_faults,
            self.connect_failures
        )
    }
}
