//! Calendar and notification fan-out for extracted events

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use kiddo_domain::{CalendarEvent, Notification, NotificationStatus, StructuredEvent};
use serde::Serialize;
use tracing::{error, info, instrument};

use super::error::{SinkError, SinkResult};
use super::notification::{NotificationEngine, Recipient};
use super::ports::CalendarSink;

struct CalendarTarget {
    sink: Arc<dyn CalendarSink>,
    calendar_id: String,
}

/// A sink call that did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkFailure {
    pub sink: String,
    pub error: String,
}

/// Everything one fan-out produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct FanoutReport {
    pub calendar_events: Vec<CalendarEvent>,
    pub notifications: Vec<Notification>,
    pub failures: Vec<SinkFailure>,
}

impl FanoutReport {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, sink: &str, error: impl ToString) {
        self.failures.push(SinkFailure { sink: sink.to_string(), error: error.to_string() });
    }
}

/// Delivers a structured event to every calendar and recipient.
///
/// Each sink is isolated: a failure or timeout is logged and recorded in the
/// [`FanoutReport`], and the remaining sinks still run.
pub struct SinkFanout {
    calendars: Vec<CalendarTarget>,
    notifications: NotificationEngine,
    recipients: Vec<Recipient>,
    sink_timeout: Option<Duration>,
}

impl SinkFanout {
    pub fn new(notifications: NotificationEngine) -> Self {
        Self { calendars: Vec::new(), notifications, recipients: Vec::new(), sink_timeout: None }
    }

    /// Fan-out with no sinks at all
    pub fn empty() -> Self {
        Self::new(NotificationEngine::default())
    }

    #[must_use]
    pub fn with_calendar(mut self, sink: Arc<dyn CalendarSink>, calendar_id: impl Into<String>) -> Self {
        self.calendars.push(CalendarTarget { sink, calendar_id: calendar_id.into() });
        self
    }

    #[must_use]
    pub fn with_recipient(mut self, recipient: Recipient) -> Self {
        self.recipients.push(recipient);
        self
    }

    #[must_use]
    pub fn with_sink_timeout(mut self, timeout: Duration) -> Self {
        self.sink_timeout = Some(timeout);
        self
    }

    pub fn calendar_count(&self) -> usize {
        self.calendars.len()
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    /// Create the event in every calendar, then notify every recipient
    #[instrument(skip(self, event), fields(structured_id = %event.event_id, title = %event.title))]
    pub async fn dispatch(&self, event: &StructuredEvent) -> FanoutReport {
        let mut report = FanoutReport::default();

        for target in &self.calendars {
            let sink = target.sink.name();
            let created = self
                .bounded(sink, async {
                    target
                        .sink
                        .create_event(event, &target.calendar_id)
                        .await
                        .map_err(|e| SinkError::delivery(sink, e.to_string()))
                })
                .await;

            match created {
                Ok(calendar_event) if calendar_event.is_synced() => {
                    report.calendar_events.push(calendar_event);
                }
                Ok(calendar_event) => {
                    let reason = calendar_event
                        .error_message
                        .clone()
                        .unwrap_or_else(|| format!("sync status {}", calendar_event.sync_status));
                    error!(sink, calendar_id = %target.calendar_id, error = %reason, "Calendar sync failed");
                    report.fail(sink, reason);
                    report.calendar_events.push(calendar_event);
                }
                Err(e) => {
                    error!(sink, calendar_id = %target.calendar_id, error = %e, "Calendar sink failed");
                    report.fail(sink, &e);
                    report.calendar_events.push(CalendarEvent::failed(
                        sink,
                        &target.calendar_id,
                        event.event_id,
                        e.to_string(),
                    ));
                }
            }
        }

        for recipient in &self.recipients {
            let channel = recipient.channel.as_str();
            let sent = self
                .bounded(
                    channel,
                    self.notifications.send_notification(event, channel, &recipient.address, None),
                )
                .await;

            match sent {
                Ok(notification) if notification.status == NotificationStatus::Failed => {
                    let reason = notification.error_message.clone().unwrap_or_default();
                    error!(channel, error = %reason, "Notification failed");
                    report.fail(channel, reason);
                    report.notifications.push(notification);
                }
                Ok(notification) => report.notifications.push(notification),
                Err(e) => {
                    error!(channel, error = %e, "Notification sink failed");
                    report.fail(channel, &e);
                }
            }
        }

        info!(
            calendars = report.calendar_events.len(),
            notifications = report.notifications.len(),
            failures = report.failure_count(),
            "Fan-out completed"
        );
        report
    }

    async fn bounded<T>(
        &self,
        sink: &str,
        call: impl Future<Output = SinkResult<T>>,
    ) -> SinkResult<T> {
        match self.sink_timeout {
            Some(duration) => tokio::time::timeout(duration, call)
                .await
                .map_err(|_| SinkError::Timeout { sink: sink.to_string(), duration })?,
            None => call.await,
        }
    }
}
