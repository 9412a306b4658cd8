//! Synchronization primitives for the event pipeline
//!
//! - **`queue`**: in-memory acknowledgement queue with at-least-once delivery,
//!   redelivery ceiling and optional backpressure

pub mod queue;

pub use queue::{
    AckOutcome, AckQueue, Delivery, NackOutcome, OverflowPolicy, PublishOutcome, QueueConfig,
    QueueError, QueueMetrics, QueueMetricsSnapshot, QueueResult,
};
