//! Email channel writing to an outbox file

use async_trait::async_trait;
use chrono::Utc;
use kiddo_core::NotificationChannel;
use kiddo_domain::{EmailChannelConfig, Notification, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use tracing::debug;

use crate::jsonl::JsonlWriter;

static EMAIL_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("EMAIL_ADDRESS regex should compile - this is a bug")
});

/// Queues emails as JSON lines for a mail relay to pick up
pub struct EmailChannel {
    name: String,
    from_address: String,
    outbox: JsonlWriter,
}

impl EmailChannel {
    pub fn from_config(config: &EmailChannelConfig) -> Self {
        Self {
            name: config.name.clone(),
            from_address: config.from_address.clone(),
            outbox: JsonlWriter::new(config.outbox.clone()),
        }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, notification: &Notification) -> Result<bool> {
        let subject = notification.message.lines().next().unwrap_or_default();
        self.outbox
            .append(&json!({
                "notification_id": notification.notification_id,
                "event_id": notification.event_id,
                "from": self.from_address,
                "to": notification.recipient,
                "subject": subject,
                "body": notification.message,
                "queued_at": Utc::now(),
            }))
            .await?;
        debug!(channel = %self.name, to = %notification.recipient, "Email queued");
        Ok(true)
    }

    fn validate_recipient(&self, recipient: &str) -> bool {
        EMAIL_ADDRESS.is_match(recipient)
    }
}
