//! In-memory event queue over the shared acknowledgement queue

use async_trait::async_trait;
use futures::StreamExt;
use kiddo_common::{
    AckOutcome, AckQueue, ErrorClassification, NackOutcome, OverflowPolicy, PublishOutcome,
    QueueConfig, QueueMetricsSnapshot,
};
use kiddo_core::{EventQueue, EventStream};
use kiddo_domain::constants::GENERATED_EVENT_ID_PREFIX;
use kiddo_domain::{KiddoError, QueueSettings, RawEvent, Result};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::InfraError;

/// At-least-once FIFO queue of [`RawEvent`]s held in process memory.
///
/// Nothing survives a restart; connectors re-deliver anything that was never
/// marked as processed.
pub struct InMemoryEventQueue {
    inner: AckQueue<RawEvent>,
}

impl InMemoryEventQueue {
    /// Unbounded queue without deduplication or a redelivery ceiling
    pub fn new() -> Self {
        Self { inner: AckQueue::new() }
    }

    /// Build from the `queue` config section
    ///
    /// # Errors
    ///
    /// Returns `KiddoError::Config` for a zero capacity
    pub fn from_settings(settings: &QueueSettings) -> Result<Self> {
        let overflow =
            if settings.reject_when_full { OverflowPolicy::Reject } else { OverflowPolicy::Block };
        let config = QueueConfig {
            max_capacity: settings.max_capacity,
            overflow,
            max_redeliveries: settings.max_redeliveries,
            deduplicate: settings.deduplicate,
        };
        let inner = AckQueue::with_config(config).map_err(InfraError::from)?;
        Ok(Self { inner })
    }

    /// Events waiting to be consumed
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn in_flight_len(&self) -> usize {
        self.inner.in_flight_len()
    }

    /// End every consume stream and reject further publishes
    pub fn close(&self) {
        self.inner.close();
    }
}

impl Default for InMemoryEventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventQueue for InMemoryEventQueue {
    async fn publish(&self, mut event: RawEvent) -> Result<PublishOutcome> {
        let id = event
            .event_id
            .get_or_insert_with(|| format!("{GENERATED_EVENT_ID_PREFIX}{}", Uuid::new_v4()))
            .clone();
        debug!(event_id = %id, source_id = %event.source_id, "publishing event");
        self.inner.publish(id.clone(), event).await.map_err(|e| {
            warn!(
                event_id = %id,
                retryable = e.is_retryable(),
                severity = %e.severity(),
                error = %e,
                "publish rejected"
            );
            InfraError::from(e).into()
        })
    }

    fn consume(&self) -> EventStream {
        self.inner.consume().map(|delivery| Ok(delivery.item)).boxed()
    }

    fn ack(&self, event_id: &str) -> AckOutcome {
        self.inner.ack(event_id)
    }

    fn nack(&self, event_id: &str, requeue: bool) -> NackOutcome<RawEvent> {
        self.inner.nack(event_id, requeue)
    }

    fn requeue_in_flight(&self) -> usize {
        self.inner.requeue_in_flight()
    }

    fn metrics(&self) -> QueueMetricsSnapshot {
        self.inner.metrics()
    }
}
