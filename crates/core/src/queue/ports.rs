//! Port interface for the queue between ingestion and processing

use async_trait::async_trait;
use kiddo_common::{AckOutcome, NackOutcome, PublishOutcome, QueueMetricsSnapshot};
use kiddo_domain::{RawEvent, Result};

use crate::ingestion::EventStream;

/// At-least-once FIFO queue of raw events addressed by `event_id`
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Append an event to the tail of the backlog.
    ///
    /// Events without an `event_id` are given one so they stay addressable.
    async fn publish(&self, event: RawEvent) -> Result<PublishOutcome>;

    /// Lazy sequence of events in FIFO order; every yielded event is in flight
    /// until acked or nacked. Calling again after the stream is dropped resumes
    /// from the current backlog.
    fn consume(&self) -> EventStream;

    /// Settle an in-flight event. Unknown ids are a no-op.
    fn ack(&self, event_id: &str) -> AckOutcome;

    /// Return an in-flight event to the tail of the backlog, or drop it
    fn nack(&self, event_id: &str, requeue: bool) -> NackOutcome<RawEvent>;

    /// Put every unsettled in-flight event back at the head of the backlog.
    /// Only safe once no consumer is processing. Returns how many were moved.
    fn requeue_in_flight(&self) -> usize;

    /// Counters and gauges of the underlying queue
    fn metrics(&self) -> QueueMetricsSnapshot;
}
