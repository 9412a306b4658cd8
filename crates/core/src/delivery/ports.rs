//! Port interfaces for downstream sinks

use async_trait::async_trait;
use kiddo_domain::{CalendarEvent, Notification, RawEvent, Result, StructuredEvent};

use super::notification::render_message;

/// Calendar provider capability set
#[async_trait]
pub trait CalendarSink: Send + Sync {
    /// Provider name recorded on every [`CalendarEvent`]
    fn name(&self) -> &str;

    /// Create the event in the given calendar
    async fn create_event(&self, event: &StructuredEvent, calendar_id: &str) -> Result<CalendarEvent>;
}

/// Notification channel capability set
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Channel name recipients are addressed by
    fn name(&self) -> &str;

    /// Deliver the notification. `Ok(false)` means the channel declined it.
    async fn send(&self, notification: &Notification) -> Result<bool>;

    /// Whether the address is usable on this channel
    fn validate_recipient(&self, recipient: &str) -> bool;

    /// Message text for `event` on this channel
    fn render(&self, event: &StructuredEvent) -> String {
        render_message(event)
    }
}

/// Destination for events that exhausted their redeliveries
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    /// Persist or report the event with the failure that exhausted it
    async fn deliver(&self, event: &RawEvent, reason: &str) -> Result<()>;
}
