//! In-memory scripted source

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use kiddo_core::{EventStream, SourceConnector};
use kiddo_domain::{KiddoError, MemoryConnectorConfig, RawEvent, Result};
use parking_lot::Mutex;
use tracing::debug;

/// Source backed by a list of events held in memory.
///
/// Every fetch yields the events not yet marked as processed, in insertion
/// order. Events can be pushed while the pipeline runs.
pub struct MemoryConnector {
    source_id: String,
    events: Mutex<Vec<RawEvent>>,
    processed: Mutex<HashSet<String>>,
    connected: AtomicBool,
    fetch_count: AtomicUsize,
}

impl MemoryConnector {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            events: Mutex::new(Vec::new()),
            processed: Mutex::new(HashSet::new()),
            connected: AtomicBool::new(false),
            fetch_count: AtomicUsize::new(0),
        }
    }

    /// Seed from the `memory` connector config section
    pub fn from_config(config: &MemoryConnectorConfig) -> Self {
        let connector = Self::new(config.source_id.clone());
        for seed in &config.events {
            let mut event =
                RawEvent::new(config.source_id.clone(), seed.payload.clone()).with_event_id(&seed.event_id);
            if let Some(event_type) = &seed.event_type {
                event = event.with_type(event_type.clone());
            }
            connector.push(event);
        }
        connector
    }

    /// Add an event; it is stamped with this connector's `source_id`
    pub fn push(&self, mut event: RawEvent) {
        event.source_id.clone_from(&self.source_id);
        self.events.lock().push(event);
    }

    /// Ids marked as processed so far
    pub fn processed_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.processed.lock().iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::Relaxed)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn is_marked(&self, event: &RawEvent) -> bool {
        event.event_id.as_ref().is_some_and(|id| self.processed.lock().contains(id))
    }
}

#[async_trait]
impl SourceConnector for MemoryConnector {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        debug!(source_id = %self.source_id, "memory connector connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_events(&self) -> Result<EventStream> {
        if !self.is_connected() {
            return Err(KiddoError::Connector(format!("{} is not connected", self.source_id)));
        }
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        let pending: Vec<Result<RawEvent>> = self
            .events
            .lock()
            .iter()
            .filter(|event| !self.is_marked(event))
            .cloned()
            .map(Ok)
            .collect();

        Ok(stream::iter(pending).boxed())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.is_connected())
    }

    async fn is_processed(&self, event: &RawEvent) -> Result<bool> {
        Ok(self.is_marked(event))
    }

    async fn mark_as_processed(&self, event: &RawEvent) -> Result<bool> {
        let Some(id) = &event.event_id else {
            return Ok(false);
        };
        self.processed.lock().insert(id.clone());
        Ok(true)
    }
}
