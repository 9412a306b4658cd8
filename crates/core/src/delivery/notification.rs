//! Notification engine: routes structured events to named channels

use std::collections::HashMap;
use std::sync::Arc;

use kiddo_domain::{Notification, StructuredEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{SinkError, SinkResult};
use super::ports::NotificationChannel;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";
const SMS_DATE_FORMAT: &str = "%d.%m %H:%M";
const SMS_TITLE_CHARS: usize = 50;
/// Locations this long or longer are left out of SMS summaries
const SMS_LOCATION_LIMIT: usize = 30;
const ELLIPSIS: &str = "...";

/// Length of a single SMS segment
pub const SMS_MAX_LENGTH: usize = 160;

/// One address on one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub channel: String,
    pub address: String,
}

impl Recipient {
    pub fn new(channel: impl Into<String>, address: impl Into<String>) -> Self {
        Self { channel: channel.into(), address: address.into() }
    }
}

/// Sends event notifications through registered channels
#[derive(Clone, Default)]
pub struct NotificationEngine {
    channels: HashMap<String, Arc<dyn NotificationChannel>>,
}

impl NotificationEngine {
    pub fn new(channels: impl IntoIterator<Item = Arc<dyn NotificationChannel>>) -> Self {
        let mut engine = Self::default();
        for channel in channels {
            engine.add_channel(channel);
        }
        engine
    }

    /// Register a channel under its name, replacing any earlier one
    pub fn add_channel(&mut self, channel: Arc<dyn NotificationChannel>) {
        let name = channel.name().to_string();
        if self.channels.insert(name.clone(), channel).is_some() {
            warn!(channel = %name, "Replacing notification channel");
        }
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Send a notification about `event` to one recipient.
    ///
    /// Unknown channels and invalid recipients are errors. A channel that
    /// fails or declines the send yields a notification with status `Failed`.
    pub async fn send_notification(
        &self,
        event: &StructuredEvent,
        channel: &str,
        recipient: &str,
        message: Option<&str>,
    ) -> SinkResult<Notification> {
        let handler =
            self.channels.get(channel).ok_or_else(|| SinkError::UnknownChannel(channel.to_string()))?;

        if !handler.validate_recipient(recipient) {
            return Err(SinkError::InvalidRecipient {
                channel: channel.to_string(),
                recipient: recipient.to_string(),
            });
        }

        let body = message.map_or_else(|| handler.render(event), str::to_string);
        let mut notification = Notification::new(event.event_id, channel, recipient, body);

        match handler.send(&notification).await {
            Ok(true) => notification.mark_sent(),
            Ok(false) => notification.mark_failed("channel declined the message"),
            Err(e) => notification.mark_failed(e.to_string()),
        }

        debug!(
            channel,
            recipient,
            status = %notification.status,
            "Notification processed"
        );
        Ok(notification)
    }

    /// Notify every recipient, continuing past failures
    pub async fn send_to_all(
        &self,
        event: &StructuredEvent,
        recipients: &[Recipient],
    ) -> Vec<Notification> {
        let mut notifications = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            match self.send_notification(event, &recipient.channel, &recipient.address, None).await {
                Ok(notification) => notifications.push(notification),
                Err(e) => warn!(
                    channel = %recipient.channel,
                    error = %e,
                    "Failed to send notification"
                ),
            }
        }
        notifications
    }
}

/// Default notification text for an event
pub fn render_message(event: &StructuredEvent) -> String {
    let due = event
        .due_date
        .or(event.start_time)
        .map_or_else(|| "N/A".to_string(), |due| due.format(DATE_FORMAT).to_string());

    let mut message = format!("Event: {}\nDue: {due}", event.title);
    if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
        message.push('\n');
        message.push_str(description);
    }
    message
}

/// One-line summary for text messages: `title | dd.mm HH:MM | location`.
///
/// The title is cut to 50 characters and the location is only included when
/// shorter than 30. A summary longer than `max_length` characters is cut and
/// ends with `...`.
pub fn render_sms_summary(event: &StructuredEvent, max_length: usize) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(3);

    if !event.title.is_empty() {
        parts.push(event.title.chars().take(SMS_TITLE_CHARS).collect());
    }
    if let Some(start) = event.start_time {
        parts.push(start.format(SMS_DATE_FORMAT).to_string());
    }
    if let Some(location) = event.location.as_deref() {
        if !location.is_empty() && location.chars().count() < SMS_LOCATION_LIMIT {
            parts.push(location.to_string());
        }
    }

    let summary = parts.join(" | ");
    if summary.chars().count() <= max_length {
        return summary;
    }
    if max_length < ELLIPSIS.len() {
        return summary.chars().take(max_length).collect();
    }

    let mut truncated: String =
        summary.chars().take(max_length - ELLIPSIS.len()).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use kiddo_domain::{KiddoError, NotificationStatus, Result};

    use super::*;

    struct RecordingChannel {
        name: &'static str,
        outcome: Result<bool>,
        sent: Mutex<Vec<Notification>>,
    }

    impl RecordingChannel {
        fn new(name: &'static str, outcome: Result<bool>) -> Arc<Self> {
            Arc::new(Self { name, outcome, sent: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn send(&self, notification: &Notification) -> Result<bool> {
            self.sent.lock().unwrap().push(notification.clone());
            self.outcome.clone()
        }

        fn validate_recipient(&self, recipient: &str) -> bool {
            recipient.contains('@')
        }
    }

    fn event() -> StructuredEvent {
        let mut event = StructuredEvent::new("Zebranie", "gmail");
        event.start_time = Some(Utc.with_ymd_and_hms(2024, 9, 12, 17, 0, 0).unwrap());
        event.description = Some("Sala 12".into());
        event
    }

    #[test]
    fn test_render_message_prefers_due_date() {
        let mut event = event();
        assert_eq!(render_message(&event), "Event: Zebranie\nDue: 2024-09-12 17:00\nSala 12");

        event.due_date = Some(Utc.with_ymd_and_hms(2024, 9, 10, 0, 0, 0).unwrap());
        event.description = None;
        assert_eq!(render_message(&event), "Event: Zebranie\nDue: 2024-09-10 00:00");

        event.due_date = None;
        event.start_time = None;
        assert_eq!(render_message(&event), "Event: Zebranie\nDue: N/A");
    }

    #[test]
    fn test_sms_summary_joins_title_time_and_short_location() {
        let mut event = event();
        event.location = Some("Szkoła, sala 12".into());

        assert_eq!(render_sms_summary(&event, SMS_MAX_LENGTH), "Zebranie | 12.09 17:00 | Szkoła, sala 12");

        event.location = Some("a".repeat(29));
        assert!(render_sms_summary(&event, SMS_MAX_LENGTH).ends_with(&"a".repeat(29)));
        event.location = Some("a".repeat(30));
        assert_eq!(render_sms_summary(&event, SMS_MAX_LENGTH), "Zebranie | 12.09 17:00");

        event.start_time = None;
        event.location = None;
        assert_eq!(render_sms_summary(&event, SMS_MAX_LENGTH), "Zebranie");
    }

    #[test]
    fn test_sms_summary_cuts_title_to_fifty_chars() {
        let mut event = event();
        event.title = "ż".repeat(60);
        event.start_time = None;

        let summary = render_sms_summary(&event, SMS_MAX_LENGTH);
        assert_eq!(summary.chars().count(), 50);
    }

    #[test]
    fn test_sms_summary_truncates_with_ellipsis() {
        let event = event();
        let full = render_sms_summary(&event, SMS_MAX_LENGTH);
        assert_eq!(full.chars().count(), 22);

        assert_eq!(render_sms_summary(&event, 22), full);
        assert_eq!(render_sms_summary(&event, 21), "Zebranie | 12.09 1...");
        assert_eq!(render_sms_summary(&event, 21).chars().count(), 21);
        assert_eq!(render_sms_summary(&event, 3), "...");
        assert_eq!(render_sms_summary(&event, 2), "Ze");
    }

    #[tokio::test]
    async fn test_send_marks_sent() {
        let channel = RecordingChannel::new("email", Ok(true));
        let engine = NotificationEngine::new([channel.clone() as Arc<dyn NotificationChannel>]);

        let event = event();

        let notification =
            engine.send_notification(&event, "email", "rodzic@example.com", None).await.unwrap();

        assert_eq!(notification.status, NotificationStatus::Sent);
        assert_eq!(notification.event_id, event.event_id);
        assert!(notification.message.starts_with("Event: Zebranie"));
        assert_eq!(channel.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_channel_and_bad_recipient_are_errors() {
        let engine = NotificationEngine::new([
            RecordingChannel::new("email", Ok(true)) as Arc<dyn NotificationChannel>
        ]);

        let unknown = engine.send_notification(&event(), "pigeon", "roof", None).await;
        assert!(matches!(unknown, Err(SinkError::UnknownChannel(_))));

        let invalid = engine.send_notification(&event(), "email", "not-an-address", None).await;
        assert!(matches!(invalid, Err(SinkError::InvalidRecipient { .. })));
    }

    #[tokio::test]
    async fn test_channel_error_yields_failed_notification() {
        let engine = NotificationEngine::new([RecordingChannel::new(
            "email",
            Err(KiddoError::Sink("smtp down".into())),
        ) as Arc<dyn NotificationChannel>]);

        let notification =
            engine.send_notification(&event(), "email", "a@example.com", Some("custom")).await.unwrap();

        assert_eq!(notification.status, NotificationStatus::Failed);
        assert_eq!(notification.message, "custom");
        assert!(notification.error_message.unwrap().contains("smtp down"));
    }

    #[tokio::test]
    async fn test_send_to_all_continues_past_failures() {
        let channel = RecordingChannel::new("email", Ok(true));
        let engine = NotificationEngine::new([channel.clone() as Arc<dyn NotificationChannel>]);
        let recipients = vec![
            Recipient::new("sms", "+48600100200"),
            Recipient::new("email", "bad"),
            Recipient::new("email", "mama@example.com"),
        ];

        let notifications = engine.send_to_all(&event(), &recipients).await;

        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].recipient, "mama@example.com");
    }
}
