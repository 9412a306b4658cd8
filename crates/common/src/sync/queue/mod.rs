// In-memory at-least-once acknowledgement queue

mod core;
mod errors;
pub mod metrics;
mod types;

pub use self::core::AckQueue;
pub use self::errors::{QueueError, QueueResult};
pub use self::metrics::{QueueMetrics, QueueMetricsSnapshot};
pub use self::types::{
    AckOutcome, Delivery, NackOutcome, OverflowPolicy, PublishOutcome, QueueConfig,
};
