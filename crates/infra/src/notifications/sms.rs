//! SMS channel writing to an outbox file

use async_trait::async_trait;
use chrono::Utc;
use kiddo_core::{render_sms_summary, NotificationChannel, SMS_MAX_LENGTH};
use kiddo_domain::{Notification, Result, SmsChannelConfig, StructuredEvent};
use serde_json::json;
use tracing::debug;

use crate::jsonl::JsonlWriter;

const MIN_PHONE_DIGITS: usize = 9;
const MAX_PHONE_DIGITS: usize = 15;

/// Queues text messages as JSON lines for an SMS gateway to pick up
pub struct SmsChannel {
    name: String,
    sender_id: Option<String>,
    outbox: JsonlWriter,
}

impl SmsChannel {
    pub fn from_config(config: &SmsChannelConfig) -> Self {
        Self {
            name: config.name.clone(),
            sender_id: config.sender_id.clone(),
            outbox: JsonlWriter::new(config.outbox.clone()),
        }
    }
}

/// Digits of a phone number once `+`, `-` and spaces are stripped
fn phone_digits(recipient: &str) -> String {
    recipient.chars().filter(|c| !matches!(c, '+' | '-' | ' ')).collect()
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, notification: &Notification) -> Result<bool> {
        self.outbox
            .append(&json!({
                "notification_id": notification.notification_id,
                "event_id": notification.event_id,
                "sender_id": self.sender_id,
                "to": phone_digits(&notification.recipient),
                "text": notification.message,
                "queued_at": Utc::now(),
            }))
            .await?;
        debug!(channel = %self.name, "SMS queued");
        Ok(true)
    }

    fn validate_recipient(&self, recipient: &str) -> bool {
        let digits = phone_digits(recipient);
        (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len())
            && digits.chars().all(|c| c.is_ascii_digit())
    }

    fn render(&self, event: &StructuredEvent) -> String {
        render_sms_summary(event, SMS_MAX_LENGTH)
    }
}
