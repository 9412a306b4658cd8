//! Scripted source connector

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use kiddo_core::{EventStream, SourceConnector};
use kiddo_domain::{KiddoError, RawEvent, Result};
use parking_lot::Mutex;

/// Connector yielding a fixed list of events.
///
/// Filters processed ids out of each fetch unless `filter_processed` is off,
/// and can be told to fail connects, fetches or marks.
pub struct ScriptedConnector {
    source_id: String,
    events: Vec<RawEvent>,
    filter_processed: bool,
    fail_connect: bool,
    fetch_failures: AtomicUsize,
    mark_failures: AtomicUsize,
    processed: Mutex<HashSet<String>>,
    pub marks: Mutex<Vec<String>>,
    pub fetches: AtomicUsize,
    pub connected: AtomicBool,
    pub disconnects: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new(source_id: &str, events: Vec<RawEvent>) -> Self {
        Self {
            source_id: source_id.to_string(),
            events,
            filter_processed: true,
            fail_connect: false,
            fetch_failures: AtomicUsize::new(0),
            mark_failures: AtomicUsize::new(0),
            processed: Mutex::new(HashSet::new()),
            marks: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            connected: AtomicBool::new(false),
            disconnects: AtomicUsize::new(0),
        }
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn failing_fetches(self, times: usize) -> Self {
        self.fetch_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn failing_marks(self, times: usize) -> Self {
        self.mark_failures.store(times, Ordering::SeqCst);
        self
    }

    /// Keep yielding processed items so the idempotency check has to catch them
    pub fn without_filtering(mut self) -> Self {
        self.filter_processed = false;
        self
    }

    pub fn already_processed(self, event_id: &str) -> Self {
        self.processed.lock().insert(event_id.to_string());
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn marks(&self) -> Vec<String> {
        self.marks.lock().clone()
    }
}

fn consume_failure(counter: &AtomicUsize) -> bool {
    counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1)).is_ok()
}

#[async_trait]
impl SourceConnector for ScriptedConnector {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn connect(&self) -> Result<()> {
        if self.fail_connect {
            return Err(KiddoError::Connector(format!("{} refused the connection", self.source_id)));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn fetch_events(&self) -> Result<EventStream> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if consume_failure(&self.fetch_failures) {
            return Err(KiddoError::Connector("mailbox unavailable".into()));
        }

        let processed = self.processed.lock().clone();
        let pending: Vec<Result<RawEvent>> = self
            .events
            .iter()
            .filter(|event| {
                !self.filter_processed
                    || event.event_id.as_ref().map_or(true, |id| !processed.contains(id))
            })
            .cloned()
            .map(Ok)
            .collect();

        Ok(stream::iter(pending).boxed())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.connected.load(Ordering::SeqCst))
    }

    async fn is_processed(&self, event: &RawEvent) -> Result<bool> {
        Ok(event.event_id.as_ref().is_some_and(|id| self.processed.lock().contains(id)))
    }

    async fn mark_as_processed(&self, event: &RawEvent) -> Result<bool> {
        if consume_failure(&self.mark_failures) {
            return Err(KiddoError::Connector("ledger write failed".into()));
        }
        let Some(id) = event.event_id.clone() else {
            return Ok(false);
        };
        self.processed.lock().insert(id.clone());
        self.marks.lock().push(id);
        Ok(true)
    }
}
