//! Pipeline orchestrator.
//!
//! Runs one ingestion loop per connected source plus a single processing loop,
//! all sharing one [`EventQueue`]. Each consumed event is extracted, fanned out
//! to the sinks, marked as processed by its connector and then acked. Extraction
//! or marking failures nack the event back to the tail of the queue.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use kiddo_core::{Orchestrator, OrchestratorConfig, SinkFanout};
//!
//! # async fn example(
//! #     connectors: Vec<Arc<dyn kiddo_core::SourceConnector>>,
//! #     queue: Arc<dyn kiddo_core::EventQueue>,
//! #     pipeline: Arc<dyn kiddo_core::ExtractionPipeline>,
//! # ) -> Result<(), kiddo_core::OrchestratorError> {
//! let mut orchestrator = Orchestrator::new(
//!     connectors,
//!     queue,
//!     pipeline,
//!     SinkFanout::empty(),
//!     OrchestratorConfig::default(),
//! )?;
//!
//! orchestrator.start().await?;
//! // ... application runs ...
//! orchestrator.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::StreamExt;
use kiddo_common::{AckOutcome, NackOutcome, PublishOutcome, QueueMetricsSnapshot};
use kiddo_domain::{KiddoError, RawEvent, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::config::OrchestratorConfig;
use super::error::{OrchestratorError, OrchestratorResult};
use super::metrics::{PipelineMetrics, PipelineMetricsSnapshot};
use super::registry::ConnectorRegistry;
use crate::delivery::{DeadLetterSink, SinkFanout};
use crate::ingestion::SourceConnector;
use crate::processing::{ExtractionError, ExtractionPipeline};
use crate::queue::EventQueue;

/// Everything the processing loop needs, cloned into its task
#[derive(Clone)]
struct ProcessingContext {
    registry: Arc<ConnectorRegistry>,
    queue: Arc<dyn EventQueue>,
    pipeline: Arc<dyn ExtractionPipeline>,
    fanout: Arc<SinkFanout>,
    dead_letters: Option<Arc<dyn DeadLetterSink>>,
    metrics: Arc<PipelineMetrics>,
    config: OrchestratorConfig,
}

/// Owns the concurrency topology of the pipeline
pub struct Orchestrator {
    context: ProcessingContext,
    cancellation_token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Orchestrator {
    /// Create an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateSource` if two connectors share a `source_id`
    pub fn new(
        connectors: Vec<Arc<dyn SourceConnector>>,
        queue: Arc<dyn EventQueue>,
        pipeline: Arc<dyn ExtractionPipeline>,
        fanout: SinkFanout,
        config: OrchestratorConfig,
    ) -> OrchestratorResult<Self> {
        let registry = ConnectorRegistry::new(connectors)?;

        Ok(Self {
            context: ProcessingContext {
                registry: Arc::new(registry),
                queue,
                pipeline,
                fanout: Arc::new(fanout),
                dead_letters: None,
                metrics: Arc::new(PipelineMetrics::new()),
                config,
            },
            cancellation_token: CancellationToken::new(),
            tasks: Vec::new(),
        })
    }

    /// Hand dead-lettered events to this sink instead of only logging them
    #[must_use]
    pub fn with_dead_letter_sink(mut self, sink: Arc<dyn DeadLetterSink>) -> Self {
        self.context.dead_letters = Some(sink);
        self
    }

    /// Connect every connector and spawn the loops.
    ///
    /// Connectors that fail to connect get no ingestion loop; the others and
    /// the processing loop still start.
    ///
    /// # Errors
    ///
    /// Returns error if the orchestrator is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> OrchestratorResult<()> {
        if self.is_running() {
            return Err(OrchestratorError::AlreadyRunning);
        }

        info!(connectors = self.context.registry.len(), "Starting orchestrator");

        // Fresh token so the orchestrator can be restarted after stop
        self.cancellation_token = CancellationToken::new();
        self.tasks.clear();

        let connected = self.connect_all().await;

        for connector in connected {
            let queue = Arc::clone(&self.context.queue);
            let metrics = Arc::clone(&self.context.metrics);
            let config = self.context.config.clone();
            let cancel = self.cancellation_token.clone();

            self.tasks.push(tokio::spawn(async move {
                Self::ingestion_loop(connector, queue, metrics, config, cancel).await;
            }));
        }

        let context = self.context.clone();
        let cancel = self.cancellation_token.clone();
        self.tasks.push(tokio::spawn(async move {
            Self::processing_loop(context, cancel).await;
        }));

        info!(tasks = self.tasks.len(), "Orchestrator started");
        Ok(())
    }

    /// Stop the loops and disconnect every connector.
    ///
    /// Loops exit at their next iteration boundary. Any still running after
    /// `shutdown_timeout` are aborted; connectors are disconnected either way.
    ///
    /// # Errors
    ///
    /// Returns `NotRunning` if the orchestrator was never started, `Timeout`
    /// if the loops had to be aborted, or `TaskJoinFailed` if a loop panicked
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> OrchestratorResult<()> {
        if self.tasks.is_empty() {
            return Err(OrchestratorError::NotRunning);
        }

        info!("Stopping orchestrator");
        self.cancellation_token.cancel();

        let mut handles = std::mem::take(&mut self.tasks);
        let shutdown_timeout = self.context.config.shutdown_timeout;

        let joined = tokio::time::timeout(shutdown_timeout, join_all(handles.iter_mut())).await;
        let result = match joined {
            Ok(results) => {
                let failures: Vec<String> = results
                    .into_iter()
                    .filter_map(std::result::Result::err)
                    .map(|join_error| {
                        error!(error = %join_error, "Pipeline task ended abnormally");
                        join_error.to_string()
                    })
                    .collect();
                if failures.is_empty() {
                    Ok(())
                } else {
                    Err(OrchestratorError::TaskJoinFailed(failures.join("; ")))
                }
            }
            Err(_) => {
                warn!(timeout = ?shutdown_timeout, "Loops did not exit in time, aborting");
                for handle in &handles {
                    handle.abort();
                }
                wait_finished(&handles).await;
                Err(OrchestratorError::Timeout {
                    operation: "orchestrator shutdown",
                    duration: shutdown_timeout,
                })
            }
        };

        // An aborted processing step leaves its event in flight with no consumer
        let recovered = self.context.queue.requeue_in_flight();
        if recovered > 0 {
            warn!(recovered, "Returned unsettled events to the queue");
        }

        self.disconnect_all().await;
        info!(metrics = ?self.metrics(), "Orchestrator stopped");

        result
    }

    /// Check if any pipeline loop is still running
    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|handle| !handle.is_finished())
    }

    /// Snapshot of the pipeline counters
    pub fn metrics(&self) -> PipelineMetricsSnapshot {
        self.context.metrics.snapshot()
    }

    /// Snapshot of the shared queue's counters and gauges
    pub fn queue_metrics(&self) -> QueueMetricsSnapshot {
        self.context.queue.metrics()
    }

    /// Connectors keyed by `source_id`
    pub fn registry(&self) -> &ConnectorRegistry {
        &self.context.registry
    }

    /// Active timeouts and backoffs
    pub fn config(&self) -> &OrchestratorConfig {
        &self.context.config
    }

    /// Health of every registered connector; errors count as unhealthy
    pub async fn connector_health(&self) -> Vec<(String, bool)> {
        let checks = self.context.registry.iter().map(|connector| async move {
            let healthy = match connector.health_check().await {
                Ok(healthy) => healthy,
                Err(e) => {
                    warn!(source_id = %connector.source_id(), error = %e, "Health check failed");
                    false
                }
            };
            (connector.source_id().to_string(), healthy)
        });
        join_all(checks).await
    }

    async fn connect_all(&self) -> Vec<Arc<dyn SourceConnector>> {
        let timeout = self.context.config.connect_timeout;
        let attempts = self.context.registry.iter().map(|connector| async move {
            match bounded(timeout, "connect", connector.connect()).await.and_then(|r| r) {
                Ok(()) => {
                    info!(source_id = %connector.source_id(), "Connector connected");
                    Some(Arc::clone(connector))
                }
                Err(e) => {
                    error!(
                        source_id = %connector.source_id(),
                        error = %e,
                        "Connector failed to connect, skipping its ingestion"
                    );
                    self.context.metrics.record_connect_failure();
                    None
                }
            }
        });

        join_all(attempts).await.into_iter().flatten().collect()
    }

    async fn disconnect_all(&self) {
        let timeout = Some(self.context.config.disconnect_timeout);
        let attempts = self.context.registry.iter().map(|connector| async move {
            if let Err(e) =
                bounded(timeout, "disconnect", connector.disconnect()).await.and_then(|r| r)
            {
                warn!(source_id = %connector.source_id(), error = %e, "Failed to disconnect connector");
            }
        });
        join_all(attempts).await;
    }

    /// Per-connector loop: drain a fetch, back off, fetch again
    async fn ingestion_loop(
        connector: Arc<dyn SourceConnector>,
        queue: Arc<dyn EventQueue>,
        metrics: Arc<PipelineMetrics>,
        config: OrchestratorConfig,
        cancel: CancellationToken,
    ) {
        let source_id = connector.source_id().to_string();
        debug!(source_id = %source_id, "Ingestion loop started");

        while !cancel.is_cancelled() {
            match Self::ingest_pass(&connector, &queue, &metrics, &config, &cancel).await {
                Ok(published) => debug!(source_id = %source_id, published, "Fetch exhausted"),
                Err(e) => {
                    warn!(source_id = %source_id, error = %e, "Connector fault, backing off");
                    metrics.record_ingest_fault();
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(config.ingest_backoff) => {}
            }
        }

        debug!(source_id = %source_id, "Ingestion loop cancelled");
    }

    /// One pass over a connector's fetch sequence
    async fn ingest_pass(
        connector: &Arc<dyn SourceConnector>,
        queue: &Arc<dyn EventQueue>,
        metrics: &PipelineMetrics,
        config: &OrchestratorConfig,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let mut events = bounded(config.fetch_timeout, "fetch", connector.fetch_events()).await??;
        let mut published = 0;

        while !cancel.is_cancelled() {
            let Some(next) = bounded(config.fetch_timeout, "fetch next event", events.next()).await?
            else {
                break;
            };
            let event = next?;

            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = queue.publish(event) => outcome?,
            };

            match outcome {
                PublishOutcome::Enqueued => {
                    published += 1;
                    metrics.record_ingested();
                }
                PublishOutcome::Duplicate => metrics.record_duplicate(),
            }
        }

        Ok(published)
    }

    /// Single consumer of the shared queue
    async fn processing_loop(context: ProcessingContext, cancel: CancellationToken) {
        debug!("Processing loop started");
        let mut events = context.queue.consume();

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => break,
                next = events.next() => next,
            };

            match next {
                Some(Ok(event)) => Self::process_event(&context, event).await,
                Some(Err(e)) => {
                    warn!(error = %e, "Queue fault, backing off");
                    context.metrics.record_consume_fault();
                    if Self::backoff(&cancel, context.config.consume_backoff).await {
                        break;
                    }
                }
                None => {
                    warn!("Event stream ended, resubscribing after backoff");
                    context.metrics.record_consume_fault();
                    if Self::backoff(&cancel, context.config.consume_backoff).await {
                        break;
                    }
                    events = context.queue.consume();
                }
            }
        }

        debug!("Processing loop cancelled");
    }

    /// Sleep unless cancelled first; returns true when cancelled
    async fn backoff(cancel: &CancellationToken, duration: Duration) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }

    /// Extract, fan out, mark, ack. Failures before the ack nack the event.
    #[instrument(skip_all, fields(event_id = %event.display_id(), source_id = %event.source_id))]
    async fn process_event(context: &ProcessingContext, event: RawEvent) {
        let Some(event_id) = event.event_id.clone() else {
            warn!("Consumed event has no id; it cannot be acked");
            return;
        };
        let connector = context.registry.get(&event.source_id);

        if let Some(connector) = connector {
            match bounded(context.config.mark_timeout, "idempotency check", connector.is_processed(&event))
                .await
                .and_then(|r| r)
            {
                Ok(true) => {
                    debug!("Event already processed, acking");
                    context.metrics.record_already_processed();
                    context.queue.ack(&event_id);
                    return;
                }
                Ok(false) => {}
                Err(e) => warn!(error = %e, "Idempotency check failed, processing anyway"),
            }
        }

        let extracted = match context.config.extraction_timeout {
            Some(limit) => tokio::time::timeout(limit, context.pipeline.process(&event))
                .await
                .unwrap_or_else(|_| Err(ExtractionError::Timeout(limit))),
            None => context.pipeline.process(&event).await,
        };

        let structured = match extracted {
            Ok(structured) => structured,
            Err(e) => {
                warn!(error = %e, "Extraction failed, requeueing");
                context.metrics.record_extraction_failure();
                Self::requeue(context, connector, &event_id, &e.to_string()).await;
                return;
            }
        };

        let report = context.fanout.dispatch(&structured).await;
        context.metrics.record_sink_failures(report.failure_count());

        match connector {
            Some(connector) => {
                match bounded(context.config.mark_timeout, "mark as processed", connector.mark_as_processed(&event))
                    .await
                    .and_then(|r| r)
                {
                    Ok(true) => {}
                    Ok(false) => warn!("Connector did not record the event as processed"),
                    Err(e) => {
                        warn!(error = %e, "Marking failed, requeueing");
                        context.metrics.record_mark_failure();
                        Self::requeue(context, Some(connector), &event_id, &e.to_string()).await;
                        return;
                    }
                }
            }
            None => warn!("No connector registered for source, skipping idempotency marking"),
        }

        if context.queue.ack(&event_id) == AckOutcome::Unknown {
            warn!("Ack for event that was no longer in flight");
        }
        context.metrics.record_processed();
        info!(structured_id = %structured.event_id, title = %structured.title, "Event processed");
    }

    /// Nack with requeue. A dead-lettered event is recorded with its connector
    /// once the dead-letter sink holds it, so the next fetch does not bring it
    /// back with a fresh redelivery count.
    async fn requeue(
        context: &ProcessingContext,
        connector: Option<&Arc<dyn SourceConnector>>,
        event_id: &str,
        reason: &str,
    ) {
        let event = match context.queue.nack(event_id, true) {
            NackOutcome::DeadLettered(event) => event,
            NackOutcome::Requeued { attempt } => {
                debug!(attempt, "Event requeued");
                return;
            }
            NackOutcome::Dropped => {
                debug!("Event dropped");
                return;
            }
            NackOutcome::Unknown => {
                warn!("Nack for event that was no longer in flight");
                return;
            }
        };

        context.metrics.record_dead_letter();
        match &context.dead_letters {
            Some(sink) => {
                if let Err(e) = sink.deliver(&event, reason).await {
                    error!(error = %e, "Dead-letter sink failed, leaving event unmarked for re-ingestion");
                    return;
                }
            }
            None => error!(reason, "Event dead-lettered with no dead-letter sink configured"),
        }

        let Some(connector) = connector else {
            return;
        };
        match bounded(context.config.mark_timeout, "mark dead-lettered", connector.mark_as_processed(&event))
            .await
            .and_then(|r| r)
        {
            Ok(true) => debug!("Dead-lettered event recorded by its connector"),
            Ok(false) => warn!("Connector did not record the dead-lettered event; it may be ingested again"),
            Err(e) => warn!(error = %e, "Failed to record dead-lettered event; it may be ingested again"),
        }
    }
}

/// Ensure loops are cancelled when the orchestrator is dropped
impl Drop for Orchestrator {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("Orchestrator dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}

/// Wait for aborted tasks to observe their cancellation
async fn wait_finished(handles: &[JoinHandle<()>]) {
    while handles.iter().any(|handle| !handle.is_finished()) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Bound an external call with an optional timeout
async fn bounded<T>(
    limit: Option<Duration>,
    operation: &'static str,
    call: impl Future<Output = T>,
) -> Result<T> {
    match limit {
        Some(duration) => tokio::time::timeout(duration, call).await.map_err(|_| {
            KiddoError::from(OrchestratorError::Timeout { operation, duration })
        }),
        None => Ok(call.await),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::ingestion::EventStream;

    struct NamedConnector(&'static str);

    #[async_trait]
    impl SourceConnector for NamedConnector {
        fn source_id(&self) -> &str {
            self.0
        }

        async fn connect(&self) -> Result<()> {
            Ok(())
        }

        async fn disconnect(&self) -> Result<()> {
            Ok(())
        }

        async fn fetch_events(&self) -> Result<EventStream> {
            Ok(futures::stream::empty().boxed())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    #[test]
    fn test_registry_rejects_duplicate_sources() {
        let connectors: Vec<Arc<dyn SourceConnector>> =
            vec![Arc::new(NamedConnector("gmail")), Arc::new(NamedConnector("gmail"))];

        let err = ConnectorRegistry::new(connectors).err();

        assert!(matches!(err, Some(OrchestratorError::DuplicateSource(id)) if id == "gmail"));
    }

    #[test]
    fn test_registry_preserves_order_and_lookup() {
        let connectors: Vec<Arc<dyn SourceConnector>> =
            vec![Arc::new(NamedConnector("b")), Arc::new(NamedConnector("a"))];

        let registry = ConnectorRegistry::new(connectors).unwrap();

        assert_eq!(registry.source_ids(), vec!["b", "a"]);
        assert!(registry.get("a").is_some());
        assert!(registry.get("c").is_none());
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let result = bounded(
            Some(Duration::from_millis(10)),
            "sleep",
            tokio::time::sleep(Duration::from_secs(5)),
        )
        .await;

        assert!(matches!(result, Err(KiddoError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_bounded_without_limit_waits() {
        let result = bounded(None, "ready", async { 7 }).await;

        assert_eq!(result.unwrap(), 7);
    }
}
