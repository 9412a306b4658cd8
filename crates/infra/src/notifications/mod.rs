//! Notification channels and their factory

mod email;
mod sms;

use std::sync::Arc;

use kiddo_core::{NotificationChannel, NotificationEngine, Recipient};
use kiddo_domain::{ChannelConfig, NotificationConfig};

pub use email::EmailChannel;
pub use sms::SmsChannel;

/// Create one channel per config entry
pub fn build_channels(configs: &[ChannelConfig]) -> Vec<Arc<dyn NotificationChannel>> {
    configs
        .iter()
        .map(|config| -> Arc<dyn NotificationChannel> {
            match config {
                ChannelConfig::Email(email) => Arc::new(EmailChannel::from_config(email)),
                ChannelConfig::Sms(sms) => Arc::new(SmsChannel::from_config(sms)),
            }
        })
        .collect()
}

/// Notification engine over every configured channel
pub fn build_notification_engine(config: &NotificationConfig) -> NotificationEngine {
    NotificationEngine::new(build_channels(&config.channels))
}

pub fn build_recipients(config: &NotificationConfig) -> Vec<Recipient> {
    config
        .recipients
        .iter()
        .map(|recipient| Recipient::new(recipient.channel.clone(), recipient.address.clone()))
        .collect()
}
