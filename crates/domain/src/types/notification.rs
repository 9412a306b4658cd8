//! Notification delivery records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::impl_domain_status_conversions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
    Delivered,
}

impl_domain_status_conversions!(NotificationStatus {
    Pending => "pending",
    Sent => "sent",
    Failed => "failed",
    Delivered => "delivered",
});

/// A message about a structured event addressed to one recipient on one
/// channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: Uuid,
    /// Id of the structured event this notification is about
    pub event_id: Uuid,
    pub channel: String,
    pub recipient: String,
    pub message: String,
    pub status: NotificationStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl Notification {
    pub fn new(
        event_id: Uuid,
        channel: impl Into<String>,
        recipient: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            notification_id: Uuid::new_v4(),
            event_id,
            channel: channel.into(),
            recipient: recipient.into(),
            message: message.into(),
            status: NotificationStatus::Pending,
            delivered_at: None,
            error_message: None,
        }
    }

    pub fn mark_sent(&mut self) {
        self.status = NotificationStatus::Sent;
        self.delivered_at = Some(Utc::now());
        self.error_message = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = NotificationStatus::Failed;
        self.error_message = Some(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        let mut notification = Notification::new(Uuid::new_v4(), "email", "a@b.pl", "hi");
        assert_eq!(notification.status, NotificationStatus::Pending);

        notification.mark_failed("smtp down");
        assert_eq!(notification.status, NotificationStatus::Failed);
        assert_eq!(notification.error_message.as_deref(), Some("smtp down"));

        notification.mark_sent();
        assert_eq!(notification.status, NotificationStatus::Sent);
        assert!(notification.delivered_at.is_some());
        assert!(notification.error_message.is_none());
    }
}
