//! Recording event queue backed by the shared acknowledgement queue

use async_trait::async_trait;
use futures::StreamExt;
use kiddo_common::{
    AckOutcome, AckQueue, NackOutcome, PublishOutcome, QueueConfig, QueueMetricsSnapshot,
};
use kiddo_core::{EventQueue, EventStream};
use kiddo_domain::{KiddoError, RawEvent, Result};
use parking_lot::Mutex;
use uuid::Uuid;

/// Event queue that records every ack and nack
pub struct RecordingQueue {
    inner: AckQueue<RawEvent>,
    pub acks: Mutex<Vec<String>>,
    pub nacks: Mutex<Vec<(String, bool)>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default().with_deduplication(true))
    }

    pub fn with_config(config: QueueConfig) -> Self {
        let inner = match AckQueue::with_config(config) {
            Ok(queue) => queue,
            Err(e) => panic!("invalid test queue config: {e}"),
        };
        Self { inner, acks: Mutex::new(Vec::new()), nacks: Mutex::new(Vec::new()) }
    }

    pub fn acks(&self) -> Vec<String> {
        self.acks.lock().clone()
    }

    pub fn nacks(&self) -> Vec<(String, bool)> {
        self.nacks.lock().clone()
    }

    pub fn ack_count(&self, event_id: &str) -> usize {
        self.acks.lock().iter().filter(|id| *id == event_id).count()
    }

    pub fn inner(&self) -> &AckQueue<RawEvent> {
        &self.inner
    }
}

#[async_trait]
impl EventQueue for RecordingQueue {
    async fn publish(&self, mut event: RawEvent) -> Result<PublishOutcome> {
        let id = event.event_id.get_or_insert_with(|| format!("ingest_{}", Uuid::new_v4())).clone();
        self.inner.publish(id, event).await.map_err(|e| KiddoError::Queue(e.to_string()))
    }

    fn consume(&self) -> EventStream {
        self.inner.consume().map(|delivery| Ok(delivery.item)).boxed()
    }

    fn ack(&self, event_id: &str) -> AckOutcome {
        self.acks.lock().push(event_id.to_string());
        self.inner.ack(event_id)
    }

    fn nack(&self, event_id: &str, requeue: bool) -> NackOutcome<RawEvent> {
        self.nacks.lock().push((event_id.to_string(), requeue));
        self.inner.nack(event_id, requeue)
    }

    fn requeue_in_flight(&self) -> usize {
        self.inner.requeue_in_flight()
    }

    fn metrics(&self) -> QueueMetricsSnapshot {
        self.inner.metrics()
    }
}
