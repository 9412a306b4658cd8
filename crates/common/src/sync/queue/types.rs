use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

/// What a bounded queue does when a publish would exceed capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait until an ack or drop frees a slot
    #[default]
    Block,
    /// Fail immediately with `QueueError::CapacityExceeded`
    Reject,
}

/// Acknowledgement queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Upper bound on queued plus in-flight items. `None` means unbounded.
    pub max_capacity: Option<usize>,
    pub overflow: OverflowPolicy,
    /// Requeues allowed per id before a nack dead-letters the item.
    /// `None` keeps requeueing forever.
    pub max_redeliveries: Option<u32>,
    /// Drop publishes whose id is already queued or in flight.
    pub deduplicate: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_capacity: None,
            overflow: OverflowPolicy::Block,
            max_redeliveries: None,
            deduplicate: false,
        }
    }
}

impl QueueConfig {
    /// Bounded configuration with the given capacity and overflow policy
    pub fn bounded(max_capacity: usize, overflow: OverflowPolicy) -> Self {
        Self { max_capacity: Some(max_capacity), overflow, ..Default::default() }
    }

    /// Set the redelivery ceiling
    pub fn with_max_redeliveries(mut self, max_redeliveries: u32) -> Self {
        self.max_redeliveries = Some(max_redeliveries);
        self
    }

    /// Enable or disable publish-time deduplication
    pub fn with_deduplication(mut self, enabled: bool) -> Self {
        self.deduplicate = enabled;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> CommonResult<()> {
        if self.max_capacity == Some(0) {
            return Err(CommonError::config("max_capacity", "must be greater than 0"));
        }

        Ok(())
    }
}

/// An item handed out by `consume`, now tracked as in flight
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery<T> {
    pub id: String,
    pub item: T,
    /// How many times this id has been requeued before this delivery
    pub redeliveries: u32,
}

/// Result of a publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Enqueued,
    /// Deduplication is enabled and the id is already queued or in flight
    Duplicate,
}

/// Result of an ack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Acknowledged,
    /// The id was not in flight; nothing changed
    Unknown,
}

/// Result of a nack
#[derive(Debug, Clone, PartialEq)]
pub enum NackOutcome<T> {
    /// Re-appended to the tail of the backlog
    Requeued { attempt: u32 },
    /// Removed without requeue
    Dropped,
    /// Redelivery ceiling reached; the item is returned to the caller
    DeadLettered(T),
    /// The id was not in flight; nothing changed
    Unknown,
}

impl<T> NackOutcome<T> {
    /// True when the id was known and the nack changed queue state
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}
