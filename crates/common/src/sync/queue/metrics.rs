use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};

/// Queue metrics for monitoring
#[derive(Debug, Default)]
pub struct QueueMetrics {
    pub total_published: AtomicU64,
    pub total_delivered: AtomicU64,
    pub total_acknowledged: AtomicU64,
    pub total_requeued: AtomicU64,
    pub total_dropped: AtomicU64,
    pub total_dead_lettered: AtomicU64,
    pub unknown_acks: AtomicU64,
    pub duplicates: AtomicU64,
    pub capacity_rejections: AtomicU64,
    pub current_depth: AtomicUsize,
    pub current_in_flight: AtomicUsize,
    pub queue_depth_max: AtomicUsize,
    pub last_operation_time: AtomicU64,
}

impl QueueMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_publish(&self) {
        self.total_published.fetch_add(1, AtomicOrdering::Relaxed);
        self.update_last_operation();
    }

    pub fn record_delivery(&self) {
        self.total_delivered.fetch_add(1, AtomicOrdering::Relaxed);
        self.update_last_operation();
    }

    pub fn record_ack(&self) {
        self.total_acknowledged.fetch_add(1, AtomicOrdering::Relaxed);
        self.update_last_operation();
    }

    pub fn record_requeue(&self) {
        self.total_requeued.fetch_add(1, AtomicOrdering::Relaxed);
        self.update_last_operation();
    }

    pub fn record_drop(&self) {
        self.total_dropped.fetch_add(1, AtomicOrdering::Relaxed);
        self.update_last_operation();
    }

    pub fn record_dead_letter(&self) {
        self.total_dead_lettered.fetch_add(1, AtomicOrdering::Relaxed);
        self.update_last_operation();
    }

    /// Ack or nack for an id that was not in flight
    pub fn record_unknown(&self) {
        self.unknown_acks.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub fn record_capacity_rejection(&self) {
        self.capacity_rejections.fetch_add(1, AtomicOrdering::Relaxed);
        self.update_last_operation();
    }

    /// Update backlog depth and in-flight gauges
    pub fn update_gauges(&self, depth: usize, in_flight: usize) {
        self.current_depth.store(depth, AtomicOrdering::Relaxed);
        self.current_in_flight.store(in_flight, AtomicOrdering::Relaxed);
        self.update_max_depth(depth);
    }

    /// Update maximum depth if current exceeds it
    fn update_max_depth(&self, current: usize) {
        let mut max = self.queue_depth_max.load(AtomicOrdering::Relaxed);

        while current > max {
            match self.queue_depth_max.compare_exchange_weak(
                max,
                current,
                AtomicOrdering::Relaxed,
                AtomicOrdering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => max = actual,
            }
        }
    }

    /// Update last operation timestamp
    fn update_last_operation(&self) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.last_operation_time.store(now, AtomicOrdering::Relaxed);
    }

    /// Get a snapshot of metrics
    pub fn snapshot(&self) -> QueueMetricsSnapshot {
        QueueMetricsSnapshot {
            total_published: self.total_published.load(AtomicOrdering::Relaxed),
            total_delivered: self.total_delivered.load(AtomicOrdering::Relaxed),
            total_acknowledged: self.total_acknowledged.load(AtomicOrdering::Relaxed),
            total_requeued: self.total_requeued.load(AtomicOrdering::Relaxed),
            total_dropped: self.total_dropped.load(AtomicOrdering::Relaxed),
            total_dead_lettered: self.total_dead_lettered.load(AtomicOrdering::Relaxed),
            unknown_acks: self.unknown_acks.load(AtomicOrdering::Relaxed),
            duplicates: self.duplicates.load(AtomicOrdering::Relaxed),
            capacity_rejections: self.capacity_rejections.load(AtomicOrdering::Relaxed),
            current_depth: self.current_depth.load(AtomicOrdering::Relaxed),
            current_in_flight: self.current_in_flight.load(AtomicOrdering::Relaxed),
            queue_depth_max: self.queue_depth_max.load(AtomicOrdering::Relaxed),
            last_operation_time: self.last_operation_time.load(AtomicOrdering::Relaxed),
            ack_rate: self.calculate_ack_rate(),
        }
    }

    /// Percentage of settled deliveries that ended in an ack
    fn calculate_ack_rate(&self) -> f64 {
        let acked = self.total_acknowledged.load(AtomicOrdering::Relaxed);
        let failed = self.total_requeued.load(AtomicOrdering::Relaxed)
            + self.total_dropped.load(AtomicOrdering::Relaxed)
            + self.total_dead_lettered.load(AtomicOrdering::Relaxed);
        let total = acked + failed;

        if total == 0 {
            return 100.0;
        }

        (acked as f64 / total as f64) * 100.0
    }
}

/// Immutable metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMetricsSnapshot {
    pub total_published: u64,
    pub total_delivered: u64,
    pub total_acknowledged: u64,
    pub total_requeued: u64,
    pub total_dropped: u64,
    pub total_dead_lettered: u64,
    pub unknown_acks: u64,
    pub duplicates: u64,
    pub capacity_rejections: u64,
    pub current_depth: usize,
    pub current_in_flight: usize,
    pub queue_depth_max: usize,
    pub last_operation_time: u64,
    pub ack_rate: f64,
}

impl QueueMetricsSnapshot {
    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Queue Metrics:\n\
            - Depth: {} (max {}), in flight: {}\n\
            - Published: {}, delivered: {}\n\
            - Acked: {} ({:.1}%), requeued: {}, dropped: {}, dead-lettered: {}\n\
            - Duplicates: {}, capacity rejections: {}",
            self.current_depth,
            self.queue_depth_max,
            self.current_in_flight,
            self.total_published,
            self.total_delivered,
            self.total_acknowledged,
            self.ack_rate,
            self.total_requeued,
            self.total_dropped,
            self.total_dead_lettered,
            self.duplicates,
            self.capacity_rejections
        )
    }
}
