use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info, instrument, warn};

use super::errors::{QueueError, QueueResult};
use super::metrics::{QueueMetrics, QueueMetricsSnapshot};
use super::types::{AckOutcome, Delivery, NackOutcome, OverflowPolicy, PublishOutcome, QueueConfig};

/// Backlog, in-flight set and redelivery counters, always mutated together
/// under one lock.
struct QueueState<T> {
    backlog: VecDeque<(String, T)>,
    /// In-flight items tagged with their delivery sequence number
    in_flight: HashMap<String, (u64, T)>,
    redeliveries: HashMap<String, u32>,
    next_delivery: u64,
    closed: bool,
}

impl<T> QueueState<T> {
    fn occupancy(&self) -> usize {
        self.backlog.len() + self.in_flight.len()
    }

    fn contains(&self, id: &str) -> bool {
        self.in_flight.contains_key(id) || self.backlog.iter().any(|(queued, _)| queued == id)
    }
}

/// In-memory at-least-once FIFO queue with explicit acknowledgement.
///
/// Items move `queued -> in flight` when consumed and leave the in-flight set
/// on `ack`, or on `nack` (requeued to the tail, dropped, or dead-lettered once
/// `max_redeliveries` is exceeded). Cloning shares the same queue.
///
/// Acks and nacks for ids that are not in flight are no-ops reported as
/// `Unknown`; they never fail.
pub struct AckQueue<T> {
    state: Arc<Mutex<QueueState<T>>>,
    config: Arc<QueueConfig>,
    metrics: Arc<QueueMetrics>,
    item_ready: Arc<Notify>,
    space_ready: Arc<Notify>,
}

enum PublishStep {
    Done(QueueResult<PublishOutcome>),
    WaitForSpace,
}

enum ReceiveStep<T> {
    Delivered(Delivery<T>),
    Closed,
    Empty,
}

impl<T> AckQueue<T>
where
    T: Clone + Send + 'static,
{
    /// Create an unbounded queue
    pub fn new() -> Self {
        Self::build(QueueConfig::default())
    }

    /// Create a queue with custom configuration
    pub fn with_config(config: QueueConfig) -> QueueResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: QueueConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                backlog: VecDeque::new(),
                in_flight: HashMap::new(),
                redeliveries: HashMap::new(),
                next_delivery: 0,
                closed: false,
            })),
            config: Arc::new(config),
            metrics: Arc::new(QueueMetrics::new()),
            item_ready: Arc::new(Notify::new()),
            space_ready: Arc::new(Notify::new()),
        }
    }

    /// Append an item to the tail of the backlog.
    ///
    /// With a capacity set, `OverflowPolicy::Block` waits for an ack or drop to
    /// free a slot and `OverflowPolicy::Reject` fails fast.
    #[instrument(level = "debug", skip(self, item), fields(item_id = %id))]
    pub async fn publish(&self, id: String, item: T) -> QueueResult<PublishOutcome> {
        let mut item = Some(item);

        loop {
            let space = self.space_ready.notified();
            tokio::pin!(space);
            space.as_mut().enable();

            match self.try_publish(&id, &mut item) {
                PublishStep::Done(result) => return result,
                PublishStep::WaitForSpace => {
                    debug!(item_id = %id, "Queue full, waiting for capacity");
                    space.await;
                }
            }
        }
    }

    fn try_publish(&self, id: &str, item: &mut Option<T>) -> PublishStep {
        let mut state = self.state.lock();

        if state.closed {
            return PublishStep::Done(Err(QueueError::ShuttingDown));
        }

        if self.config.deduplicate && state.contains(id) {
            self.metrics.record_duplicate();
            debug!(item_id = %id, "Duplicate publish ignored");
            return PublishStep::Done(Ok(PublishOutcome::Duplicate));
        }

        if let Some(capacity) = self.config.max_capacity {
            if state.occupancy() >= capacity {
                return match self.config.overflow {
                    OverflowPolicy::Reject => {
                        self.metrics.record_capacity_rejection();
                        PublishStep::Done(Err(QueueError::CapacityExceeded(capacity)))
                    }
                    OverflowPolicy::Block => PublishStep::WaitForSpace,
                };
            }
        }

        let Some(item) = item.take() else {
            return PublishStep::Done(Err(QueueError::InvalidState(
                "publish attempted twice with the same item".to_string(),
            )));
        };

        state.backlog.push_back((id.to_string(), item));
        self.metrics.record_publish();
        self.metrics.update_gauges(state.backlog.len(), state.in_flight.len());
        drop(state);

        self.item_ready.notify_one();
        PublishStep::Done(Ok(PublishOutcome::Enqueued))
    }

    /// Take the head of the backlog without waiting.
    pub fn try_receive(&self) -> Option<Delivery<T>> {
        match self.receive_step() {
            ReceiveStep::Delivered(delivery) => Some(delivery),
            ReceiveStep::Closed | ReceiveStep::Empty => None,
        }
    }

    /// Wait for the next item. Returns `None` once the queue is closed and the
    /// backlog is drained.
    pub async fn receive(&self) -> Option<Delivery<T>> {
        loop {
            let ready = self.item_ready.notified();
            tokio::pin!(ready);
            ready.as_mut().enable();

            match self.receive_step() {
                ReceiveStep::Delivered(delivery) => return Some(delivery),
                ReceiveStep::Closed => return None,
                ReceiveStep::Empty => ready.await,
            }
        }
    }

    fn receive_step(&self) -> ReceiveStep<T> {
        let mut state = self.state.lock();

        let Some((id, item)) = state.backlog.pop_front() else {
            return if state.closed { ReceiveStep::Closed } else { ReceiveStep::Empty };
        };

        let sequence = state.next_delivery;
        state.next_delivery += 1;
        if state.in_flight.insert(id.clone(), (sequence, item.clone())).is_some() {
            warn!(item_id = %id, "Item delivered while an earlier copy is still in flight");
        }
        let redeliveries = state.redeliveries.get(&id).copied().unwrap_or(0);

        self.metrics.record_delivery();
        self.metrics.update_gauges(state.backlog.len(), state.in_flight.len());

        // More items may be waiting for other consumers.
        if !state.backlog.is_empty() {
            self.item_ready.notify_one();
        }

        ReceiveStep::Delivered(Delivery { id, item, redeliveries })
    }

    /// Lazy, unbounded sequence of deliveries in FIFO order.
    ///
    /// Every call returns an independent stream over the same backlog, so a
    /// consumer can drop its stream and call `consume` again later. Streams end
    /// only after `close`.
    pub fn consume(&self) -> BoxStream<'static, Delivery<T>> {
        stream::unfold(self.clone(), |queue| async move {
            let delivery = queue.receive().await?;
            Some((delivery, queue))
        })
        .boxed()
    }

    /// Remove an item from the in-flight set.
    #[instrument(level = "debug", skip(self))]
    pub fn ack(&self, id: &str) -> AckOutcome {
        let mut state = self.state.lock();

        if state.in_flight.remove(id).is_none() {
            self.metrics.record_unknown();
            debug!(item_id = %id, "Ack for id that is not in flight");
            return AckOutcome::Unknown;
        }

        state.redeliveries.remove(id);
        self.metrics.record_ack();
        self.metrics.update_gauges(state.backlog.len(), state.in_flight.len());
        drop(state);

        self.space_ready.notify_one();
        AckOutcome::Acknowledged
    }

    /// Remove an item from the in-flight set and requeue it to the tail, or
    /// drop it when `requeue` is false.
    #[instrument(level = "debug", skip(self))]
    pub fn nack(&self, id: &str, requeue: bool) -> NackOutcome<T> {
        let mut state = self.state.lock();

        let Some((_, item)) = state.in_flight.remove(id) else {
            self.metrics.record_unknown();
            debug!(item_id = %id, "Nack for id that is not in flight");
            return NackOutcome::Unknown;
        };

        let outcome = if requeue {
            let attempt = {
                let counter = state.redeliveries.entry(id.to_string()).or_insert(0);
                *counter += 1;
                *counter
            };

            match self.config.max_redeliveries {
                Some(max) if attempt > max => {
                    state.redeliveries.remove(id);
                    self.metrics.record_dead_letter();
                    warn!(item_id = %id, attempts = attempt, max_redeliveries = max, "Redelivery ceiling reached, dead-lettering");
                    NackOutcome::DeadLettered(item)
                }
                _ => {
                    state.backlog.push_back((id.to_string(), item));
                    self.metrics.record_requeue();
                    debug!(item_id = %id, attempt, "Item requeued");
                    NackOutcome::Requeued { attempt }
                }
            }
        } else {
            state.redeliveries.remove(id);
            self.metrics.record_drop();
            debug!(item_id = %id, "Item dropped");
            NackOutcome::Dropped
        };

        self.metrics.update_gauges(state.backlog.len(), state.in_flight.len());
        drop(state);

        match outcome {
            NackOutcome::Requeued { .. } => self.item_ready.notify_one(),
            _ => self.space_ready.notify_one(),
        }

        outcome
    }

    /// Move every in-flight item back to the head of the backlog, oldest first.
    ///
    /// For recovering deliveries whose consumer went away without settling
    /// them. Redelivery counters are left untouched. Returns the number of
    /// items requeued.
    #[instrument(level = "debug", skip(self))]
    pub fn requeue_in_flight(&self) -> usize {
        let mut state = self.state.lock();
        if state.in_flight.is_empty() {
            return 0;
        }

        let mut orphaned: Vec<(String, (u64, T))> = state.in_flight.drain().collect();
        orphaned.sort_by_key(|(_, (sequence, _))| *sequence);
        let count = orphaned.len();
        for (id, (_, item)) in orphaned.into_iter().rev() {
            state.backlog.push_front((id, item));
        }

        self.metrics.update_gauges(state.backlog.len(), state.in_flight.len());
        drop(state);

        self.item_ready.notify_one();
        info!(count, "Requeued orphaned in-flight items");
        count
    }

    /// Stop accepting publishes and end every consume stream once the backlog
    /// drains.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
        }

        self.item_ready.notify_waiters();
        self.space_ready.notify_waiters();
        info!("Acknowledgement queue closed");
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of queued items, excluding items in flight
    pub fn len(&self) -> usize {
        self.state.lock().backlog.len()
    }

    /// True when nothing is queued (items may still be in flight)
    pub fn is_empty(&self) -> bool {
        self.state.lock().backlog.is_empty()
    }

    /// Number of items delivered but not yet acked or nacked
    pub fn in_flight_len(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Ids currently in flight
    pub fn in_flight_ids(&self) -> Vec<String> {
        self.state.lock().in_flight.keys().cloned().collect()
    }

    /// Requeue count recorded for an id, if any
    pub fn redeliveries(&self, id: &str) -> Option<u32> {
        self.state.lock().redeliveries.get(id).copied()
    }

    /// Active configuration
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Get queue metrics
    pub fn metrics(&self) -> QueueMetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl<T> Clone for AckQueue<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            config: self.config.clone(),
            metrics: self.metrics.clone(),
            item_ready: self.item_ready.clone(),
            space_ready: self.space_ready.clone(),
        }
    }
}

impl<T> Default for AckQueue<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn queue() -> AckQueue<String> {
        AckQueue::new()
    }

    #[tokio::test]
    async fn test_publish_then_receive_is_fifo() {
        let queue = queue();
        queue.publish("e1".into(), "first".into()).await.unwrap();
        queue.publish("e2".into(), "second".into()).await.unwrap();

        let first = queue.receive().await.unwrap();
        let second = queue.receive().await.unwrap();

        assert_eq!(first.id, "e1");
        assert_eq!(second.id, "e2");
        assert_eq!(queue.in_flight_len(), 2);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_ack_unknown_id_is_noop() {
        let queue = queue();

        assert_eq!(queue.ack("missing"), AckOutcome::Unknown);
        assert_eq!(queue.metrics().unknown_acks, 1);
    }

    #[tokio::test]
    async fn test_nack_requeues_to_tail() {
        let queue = queue();
        queue.publish("a".into(), "a".into()).await.unwrap();
        queue.publish("b".into(), "b".into()).await.unwrap();

        let a = queue.receive().await.unwrap();
        assert_eq!(queue.nack(&a.id, true), NackOutcome::Requeued { attempt: 1 });

        let next = queue.receive().await.unwrap();
        let again = queue.receive().await.unwrap();
        assert_eq!(next.id, "b");
        assert_eq!(again.id, "a");
        assert_eq!(again.redeliveries, 1);
    }

    #[tokio::test]
    async fn test_dead_letter_after_ceiling() {
        let queue = AckQueue::with_config(QueueConfig::default().with_max_redeliveries(1)).unwrap();
        queue.publish("poison".into(), "payload".to_string()).await.unwrap();

        let first = queue.receive().await.unwrap();
        assert_eq!(queue.nack(&first.id, true), NackOutcome::Requeued { attempt: 1 });

        let second = queue.receive().await.unwrap();
        assert_eq!(queue.nack(&second.id, true), NackOutcome::DeadLettered("payload".to_string()));

        assert!(queue.try_receive().is_none());
        assert_eq!(queue.redeliveries("poison"), None);
        assert_eq!(queue.metrics().total_dead_lettered, 1);
    }

    #[tokio::test]
    async fn test_reject_policy_fails_when_full() {
        let queue = AckQueue::with_config(QueueConfig::bounded(1, OverflowPolicy::Reject)).unwrap();
        queue.publish("one".into(), "1".to_string()).await.unwrap();

        let err = queue.publish("two".into(), "2".to_string()).await.unwrap_err();
        assert!(matches!(err, QueueError::CapacityExceeded(1)));
    }

    #[tokio::test]
    async fn test_block_policy_waits_for_ack() {
        let queue = AckQueue::with_config(QueueConfig::bounded(1, OverflowPolicy::Block)).unwrap();
        queue.publish("one".into(), "1".to_string()).await.unwrap();

        let producer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.publish("two".into(), "2".to_string()).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!producer.is_finished());

        let delivery = queue.receive().await.unwrap();
        queue.ack(&delivery.id);

        let outcome = tokio::time::timeout(Duration::from_secs(1), producer)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(outcome, PublishOutcome::Enqueued);
    }

    #[tokio::test]
    async fn test_deduplicate_skips_queued_and_in_flight_ids() {
        let queue = AckQueue::with_config(QueueConfig::default().with_deduplication(true)).unwrap();
        queue.publish("x".into(), "1".to_string()).await.unwrap();
        assert_eq!(
            queue.publish("x".into(), "1".to_string()).await.unwrap(),
            PublishOutcome::Duplicate
        );

        let delivery = queue.receive().await.unwrap();
        assert_eq!(
            queue.publish(delivery.id.clone(), "1".to_string()).await.unwrap(),
            PublishOutcome::Duplicate
        );

        queue.ack(&delivery.id);
        assert_eq!(
            queue.publish("x".into(), "1".to_string()).await.unwrap(),
            PublishOutcome::Enqueued
        );
    }

    #[tokio::test]
    async fn test_requeue_in_flight_restores_delivery_order_at_head() {
        let queue = AckQueue::with_config(QueueConfig::default().with_deduplication(true)).unwrap();
        for id in ["b", "a", "c"] {
            queue.publish(id.into(), id.to_string()).await.unwrap();
        }
        queue.receive().await.unwrap();
        queue.receive().await.unwrap();
        assert_eq!(queue.publish("b".into(), "b".into()).await.unwrap(), PublishOutcome::Duplicate);

        assert_eq!(queue.requeue_in_flight(), 2);
        assert_eq!(queue.in_flight_len(), 0);
        assert_eq!(queue.redeliveries("b"), None);

        let order: Vec<String> =
            std::iter::from_fn(|| queue.try_receive().map(|delivery| delivery.id)).collect();
        assert_eq!(order, vec!["b", "a", "c"]);
        assert_eq!(queue.requeue_in_flight(), 3);
        assert_eq!(queue.requeue_in_flight(), 0);
    }

    #[tokio::test]
    async fn test_close_ends_receive_after_drain() {
        let queue = queue();
        queue.publish("last".into(), "x".into()).await.unwrap();
        queue.close();

        assert!(queue.receive().await.is_some());
        assert!(queue.receive().await.is_none());
        assert!(matches!(
            queue.publish("late".into(), "y".into()).await,
            Err(QueueError::ShuttingDown)
        ));
    }
}
