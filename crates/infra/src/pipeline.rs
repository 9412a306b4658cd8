//! Pipeline assembly from configuration
//!
//! Concrete adapters are chosen here, once, from the tagged config sections.

use std::sync::Arc;
use std::time::Duration;

use kiddo_core::{DeadLetterSink, EventQueue, SinkFanout, SourceConnector};
use kiddo_domain::{Config, Result};
use tracing::info;

use crate::calendar::build_calendar_sinks;
use crate::connectors::build_connectors;
use crate::dead_letter::build_dead_letter_sink;
use crate::notifications::{build_notification_engine, build_recipients};
use crate::queue::InMemoryEventQueue;

/// Everything the orchestrator needs apart from the extraction pipeline
pub struct PipelineComponents {
    pub connectors: Vec<Arc<dyn SourceConnector>>,
    pub queue: Arc<dyn EventQueue>,
    pub fanout: SinkFanout,
    pub dead_letters: Arc<dyn DeadLetterSink>,
}

/// Calendars and recipients wired into one fan-out
pub fn build_fanout(config: &Config) -> SinkFanout {
    let mut fanout = SinkFanout::new(build_notification_engine(&config.notifications));

    for target in build_calendar_sinks(&config.calendars, &config.pipeline.default_calendar_id) {
        fanout = fanout.with_calendar(target.sink, target.calendar_id);
    }
    for recipient in build_recipients(&config.notifications) {
        fanout = fanout.with_recipient(recipient);
    }
    if let Some(secs) = config.pipeline.sink_timeout_secs {
        fanout = fanout.with_sink_timeout(Duration::from_secs(secs));
    }
    fanout
}

/// Build every adapter named in `config`
///
/// # Errors
///
/// Returns `KiddoError::Config` when the queue settings are invalid
pub fn build_components(config: &Config) -> Result<PipelineComponents> {
    let queue = InMemoryEventQueue::from_settings(&config.queue)?;
    let connectors = build_connectors(&config.connectors);
    let fanout = build_fanout(config);

    info!(
        connectors = connectors.len(),
        calendars = fanout.calendar_count(),
        recipients = fanout.recipients().len(),
        "Pipeline components built"
    );

    Ok(PipelineComponents {
        connectors,
        queue: Arc::new(queue),
        fanout,
        dead_letters: build_dead_letter_sink(&config.dead_letter),
    })
}
