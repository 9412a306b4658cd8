//! End-to-end tests for the orchestrator's ack/nack and idempotency protocol

mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use kiddo_common::testing::poll_until;
use kiddo_common::QueueConfig;
use kiddo_core::{
    CalendarSink, EventQueue, ExtractionPipeline, Orchestrator, OrchestratorConfig,
    OrchestratorError, SinkFanout, SourceConnector,
};

use support::connectors::ScriptedConnector;
use support::pipeline::FlakyPipeline;
use support::queue::RecordingQueue;
use support::raw_event;
use support::sinks::{RecordingCalendar, RecordingDeadLetters, StallingCalendar};

const WAIT: Duration = Duration::from_secs(5);
const POLL: Duration = Duration::from_millis(10);

fn fast_config() -> OrchestratorConfig {
    OrchestratorConfig {
        ingest_backoff: Duration::from_millis(20),
        consume_backoff: Duration::from_millis(10),
        shutdown_timeout: Duration::from_secs(2),
        ..OrchestratorConfig::default()
    }
}

struct Harness {
    orchestrator: Orchestrator,
    queue: Arc<RecordingQueue>,
    pipeline: Arc<FlakyPipeline>,
    calendar: Arc<RecordingCalendar>,
}

fn harness(
    connectors: Vec<Arc<ScriptedConnector>>,
    queue: RecordingQueue,
    pipeline: FlakyPipeline,
) -> Harness {
    let queue = Arc::new(queue);
    let pipeline = Arc::new(pipeline);
    let calendar = Arc::new(RecordingCalendar::default());
    let connectors: Vec<Arc<dyn SourceConnector>> =
        connectors.into_iter().map(|c| c as Arc<dyn SourceConnector>).collect();

    let orchestrator = Orchestrator::new(
        connectors,
        Arc::clone(&queue) as Arc<dyn EventQueue>,
        Arc::clone(&pipeline) as Arc<dyn ExtractionPipeline>,
        SinkFanout::empty().with_calendar(Arc::clone(&calendar) as Arc<dyn CalendarSink>, "primary"),
        fast_config(),
    )
    .unwrap();

    Harness { orchestrator, queue, pipeline, calendar }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_single_event_is_extracted_marked_and_acked_once() {
    let connector =
        ScriptedConnector::new("src", vec![raw_event("src", "src_1", "Meeting at 10am")]).into_arc();
    let mut h = harness(vec![connector.clone()], RecordingQueue::new(), FlakyPipeline::new());

    h.orchestrator.start().await.unwrap();
    assert!(poll_until(WAIT, POLL, || async { h.queue.ack_count("src_1") == 1 }).await);

    // Give the ingestion loop a few more passes to prove nothing is re-ingested
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.orchestrator.stop().await.unwrap();

    let created = h.calendar.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].0, "primary");
    assert_eq!(created[0].1.title, "Meeting at 10am");
    assert_eq!(connector.marks(), vec!["src_1".to_string()]);
    assert_eq!(h.queue.acks(), vec!["src_1".to_string()]);
    assert!(h.queue.nacks().is_empty());
    assert_eq!(h.orchestrator.metrics().processed, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_extraction_failure_nacks_and_redelivers() {
    let connector =
        ScriptedConnector::new("src", vec![raw_event("src", "src_2", "Zebranie 17:00")]).into_arc();
    let mut h = harness(
        vec![connector.clone()],
        RecordingQueue::new(),
        FlakyPipeline::new().failing("src_2", 1),
    );

    h.orchestrator.start().await.unwrap();
    assert!(poll_until(WAIT, POLL, || async { h.queue.ack_count("src_2") == 1 }).await);
    h.orchestrator.stop().await.unwrap();

    assert_eq!(h.queue.nacks(), vec![("src_2".to_string(), true)]);
    assert_eq!(h.pipeline.attempts_for("src_2"), 2);
    assert_eq!(connector.marks(), vec!["src_2".to_string()]);
    assert_eq!(h.orchestrator.metrics().extraction_failures, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_connectors_are_each_acked_exactly_once() {
    let a = ScriptedConnector::new(
        "a",
        vec![raw_event("a", "a1", "Basen 16:00"), raw_event("a", "a2", "Angielski 17:30")],
    )
    .into_arc();
    let b = ScriptedConnector::new("b", vec![raw_event("b", "b1", "Wywiadówka 18:00")]).into_arc();
    let mut h = harness(vec![a.clone(), b.clone()], RecordingQueue::new(), FlakyPipeline::new());

    h.orchestrator.start().await.unwrap();
    assert!(poll_until(WAIT, POLL, || async { h.queue.acks().len() >= 3 }).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.orchestrator.stop().await.unwrap();

    let mut acks = h.queue.acks();
    acks.sort();
    assert_eq!(acks, vec!["a1", "a2", "b1"]);

    // Per-source arrival order survives the shared queue
    let order: Vec<_> = h
        .pipeline
        .extracted()
        .iter()
        .filter(|event| event.source_reference == "a")
        .map(|event| event.title.clone())
        .collect();
    assert_eq!(order, vec!["Basen 16:00", "Angielski 17:30"]);
    assert_eq!(a.marks(), vec!["a1".to_string(), "a2".to_string()]);
    assert_eq!(b.marks(), vec!["b1".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connect_failure_only_skips_that_connector() {
    let broken = ScriptedConnector::new("broken", vec![raw_event("broken", "x1", "never")])
        .failing_connect()
        .into_arc();
    let healthy = ScriptedConnector::new("ok", vec![raw_event("ok", "ok_1", "Obiad 13:00")]).into_arc();
    let mut h = harness(vec![broken.clone(), healthy.clone()], RecordingQueue::new(), FlakyPipeline::new());

    h.orchestrator.start().await.unwrap();
    assert!(poll_until(WAIT, POLL, || async { h.queue.ack_count("ok_1") == 1 }).await);

    let health = h.orchestrator.connector_health().await;
    h.orchestrator.stop().await.unwrap();

    assert_eq!(broken.fetches.load(Ordering::SeqCst), 0);
    assert_eq!(h.orchestrator.metrics().connect_failures, 1);
    assert_eq!(health, vec![("broken".to_string(), false), ("ok".to_string(), true)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_faults_back_off_and_retry() {
    let connector = ScriptedConnector::new("src", vec![raw_event("src", "late_1", "Teatr 19:00")])
        .failing_fetches(2)
        .into_arc();
    let mut h = harness(vec![connector.clone()], RecordingQueue::new(), FlakyPipeline::new());

    h.orchestrator.start().await.unwrap();
    assert!(poll_until(WAIT, POLL, || async { h.queue.ack_count("late_1") == 1 }).await);
    h.orchestrator.stop().await.unwrap();

    assert!(connector.fetches.load(Ordering::SeqCst) >= 3);
    assert_eq!(h.orchestrator.metrics().ingest_faults, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mark_failure_requeues_until_recorded() {
    let connector = ScriptedConnector::new("src", vec![raw_event("src", "m1", "Dentysta 9:00")])
        .failing_marks(1)
        .into_arc();
    let mut h = harness(vec![connector.clone()], RecordingQueue::new(), FlakyPipeline::new());

    h.orchestrator.start().await.unwrap();
    assert!(poll_until(WAIT, POLL, || async { h.queue.ack_count("m1") == 1 }).await);
    h.orchestrator.stop().await.unwrap();

    assert_eq!(h.queue.nacks(), vec![("m1".to_string(), true)]);
    assert_eq!(connector.marks(), vec!["m1".to_string()]);
    assert_eq!(h.orchestrator.metrics().mark_failures, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_already_processed_events_are_acked_without_extraction() {
    let connector = ScriptedConnector::new(
        "src",
        vec![raw_event("src", "old_1", "Stare"), raw_event("src", "new_1", "Nowe 10:00")],
    )
    .without_filtering()
    .already_processed("old_1")
    .into_arc();
    let mut h = harness(vec![connector], RecordingQueue::new(), FlakyPipeline::new());

    h.orchestrator.start().await.unwrap();
    assert!(
        poll_until(WAIT, POLL, || async {
            h.queue.ack_count("old_1") >= 1 && h.queue.ack_count("new_1") >= 1
        })
        .await
    );
    h.orchestrator.stop().await.unwrap();

    assert_eq!(h.pipeline.attempts_for("old_1"), 0);
    assert_eq!(h.pipeline.attempts_for("new_1"), 1);
    assert!(h.orchestrator.metrics().already_processed >= 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_poison_event_is_dead_lettered_without_blocking_others() {
    let connector = ScriptedConnector::new(
        "src",
        vec![raw_event("src", "poison", "???"), raw_event("src", "fine", "Kino 20:00")],
    )
    .into_arc();
    let dead_letters = Arc::new(RecordingDeadLetters::default());
    let queue = RecordingQueue::with_config(
        QueueConfig::default().with_deduplication(true).with_max_redeliveries(2),
    );
    let mut h =
        harness(vec![connector.clone()], queue, FlakyPipeline::new().failing("poison", usize::MAX));
    h.orchestrator = h.orchestrator.with_dead_letter_sink(dead_letters.clone());

    h.orchestrator.start().await.unwrap();
    assert!(poll_until(WAIT, POLL, || async { !dead_letters.ids().is_empty() }).await);
    assert!(poll_until(WAIT, POLL, || async { h.queue.ack_count("fine") >= 1 }).await);

    // Ten ingest backoffs: the connector must not hand the poison event back
    tokio::time::sleep(Duration::from_millis(200)).await;
    h.orchestrator.stop().await.unwrap();

    assert_eq!(dead_letters.ids(), vec!["poison".to_string()]);
    assert!(dead_letters.delivered.lock()[0].1.contains("cannot extract poison"));
    assert_eq!(h.pipeline.attempts_for("poison"), 3);
    assert_eq!(h.orchestrator.metrics().dead_lettered, 1);
    assert_eq!(h.queue.ack_count("poison"), 0);
    assert!(connector.marks().contains(&"poison".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_dead_letter_delivery_leaves_event_for_reingestion() {
    let connector = ScriptedConnector::new("src", vec![raw_event("src", "poison", "???")]).into_arc();
    let dead_letters = Arc::new(RecordingDeadLetters::failing(1));
    let queue = RecordingQueue::with_config(
        QueueConfig::default().with_deduplication(true).with_max_redeliveries(0),
    );
    let mut h =
        harness(vec![connector.clone()], queue, FlakyPipeline::new().failing("poison", usize::MAX));
    h.orchestrator = h.orchestrator.with_dead_letter_sink(dead_letters.clone());

    h.orchestrator.start().await.unwrap();
    assert!(poll_until(WAIT, POLL, || async { dead_letters.ids().len() == 1 }).await);
    tokio::time::sleep(Duration::from_millis(200)).await;
    h.orchestrator.stop().await.unwrap();

    assert_eq!(dead_letters.ids(), vec!["poison".to_string()]);
    assert_eq!(h.pipeline.attempts_for("poison"), 2);
    assert_eq!(h.orchestrator.metrics().dead_lettered, 2);
    assert_eq!(connector.marks(), vec!["poison".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_event_stuck_in_sink_is_processed_after_restart() {
    let connector =
        ScriptedConnector::new("src", vec![raw_event("src", "slow", "Wywiadowka 17:00")]).into_arc();
    let queue = Arc::new(RecordingQueue::new());
    let pipeline = Arc::new(FlakyPipeline::new());
    let calendar = Arc::new(StallingCalendar::stalled());
    let config = OrchestratorConfig { shutdown_timeout: Duration::from_millis(100), ..fast_config() };
    let mut orchestrator = Orchestrator::new(
        vec![connector.clone() as Arc<dyn SourceConnector>],
        Arc::clone(&queue) as Arc<dyn EventQueue>,
        pipeline as Arc<dyn ExtractionPipeline>,
        SinkFanout::empty().with_calendar(Arc::clone(&calendar) as Arc<dyn CalendarSink>, "primary"),
        config,
    )
    .unwrap();

    orchestrator.start().await.unwrap();
    assert!(poll_until(WAIT, POLL, || async { calendar.calls() == 1 }).await);
    assert!(matches!(orchestrator.stop().await, Err(OrchestratorError::Timeout { .. })));
    assert_eq!(queue.inner().in_flight_len(), 0);
    assert_eq!(queue.inner().len(), 1);

    calendar.release();
    orchestrator.start().await.unwrap();
    assert!(poll_until(WAIT, POLL, || async { queue.ack_count("slow") == 1 }).await);
    orchestrator.stop().await.unwrap();

    assert_eq!(calendar.calls(), 2);
    assert_eq!(connector.marks(), vec!["slow".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_event_from_unregistered_source_is_acked_without_marking() {
    let mut h = harness(Vec::new(), RecordingQueue::new(), FlakyPipeline::new());

    h.queue.publish(raw_event("ghost", "g1", "Spotkanie 12:00")).await.unwrap();
    h.orchestrator.start().await.unwrap();
    assert!(poll_until(WAIT, POLL, || async { h.queue.ack_count("g1") == 1 }).await);
    h.orchestrator.stop().await.unwrap();

    assert_eq!(h.calendar.created().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_events_without_id_get_generated_ids() {
    let mut h = harness(Vec::new(), RecordingQueue::new(), FlakyPipeline::new());
    let mut anonymous = raw_event("ghost", "unused", "Bez id");
    anonymous.event_id = None;

    h.queue.publish(anonymous).await.unwrap();
    h.orchestrator.start().await.unwrap();
    assert!(poll_until(WAIT, POLL, || async { h.queue.acks().len() == 1 }).await);
    h.orchestrator.stop().await.unwrap();

    assert!(h.queue.acks()[0].starts_with("ingest_"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_lifecycle_start_stop_restart() {
    let connector = ScriptedConnector::new("src", Vec::new()).into_arc();
    let mut h = harness(vec![connector.clone()], RecordingQueue::new(), FlakyPipeline::new());

    assert!(matches!(h.orchestrator.stop().await, Err(OrchestratorError::NotRunning)));

    h.orchestrator.start().await.unwrap();
    assert!(h.orchestrator.is_running());
    assert!(matches!(h.orchestrator.start().await, Err(OrchestratorError::AlreadyRunning)));

    h.orchestrator.stop().await.unwrap();
    assert!(!h.orchestrator.is_running());
    assert!(!connector.connected.load(Ordering::SeqCst));
    assert_eq!(connector.disconnects.load(Ordering::SeqCst), 1);

    h.orchestrator.start().await.unwrap();
    assert!(connector.connected.load(Ordering::SeqCst));
    h.orchestrator.stop().await.unwrap();
    assert_eq!(connector.disconnects.load(Ordering::SeqCst), 2);
}

struct PanickingPipeline;

#[async_trait::async_trait]
impl ExtractionPipeline for PanickingPipeline {
    async fn process(
        &self,
        event: &kiddo_domain::RawEvent,
    ) -> Result<kiddo_domain::StructuredEvent, kiddo_core::ExtractionError> {
        panic!("extractor bug on {}", event.display_id());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_reports_panicked_loop() {
    let queue = Arc::new(RecordingQueue::new());
    let mut orchestrator = Orchestrator::new(
        Vec::new(),
        Arc::clone(&queue) as Arc<dyn EventQueue>,
        Arc::new(PanickingPipeline),
        SinkFanout::empty(),
        fast_config(),
    )
    .unwrap();

    queue.publish(raw_event("ghost", "boom", "Zebranie")).await.unwrap();
    orchestrator.start().await.unwrap();
    assert!(poll_until(WAIT, POLL, || async { !orchestrator.is_running() }).await);

    let err = orchestrator.stop().await.unwrap_err();
    assert!(matches!(err, OrchestratorError::TaskJoinFailed(_)));
    // The event the panicking step held is back in the backlog
    assert_eq!(queue.inner().len(), 1);
}

#[tokio::test]
async fn test_duplicate_sources_rejected_at_construction() {
    let first = ScriptedConnector::new("same", Vec::new()).into_arc() as Arc<dyn SourceConnector>;
    let second = ScriptedConnector::new("same", Vec::new()).into_arc() as Arc<dyn SourceConnector>;

    let result = Orchestrator::new(
        vec![first, second],
        Arc::new(RecordingQueue::new()),
        Arc::new(FlakyPipeline::new()),
        SinkFanout::empty(),
        OrchestratorConfig::default(),
    );

    assert!(matches!(result, Err(OrchestratorError::DuplicateSource(_))));
}
