//! Configuration management
//!
//! Connector, calendar, channel and dead-letter sections are tagged by `type`
//! so the concrete implementation is chosen when the pipeline is built.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CALENDAR_ID, DEFAULT_CONSUME_BACKOFF_SECS, DEFAULT_EXTRACTION_TIMEOUT_SECS,
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_INGEST_BACKOFF_SECS, DEFAULT_MAILBOX_MAX_RESULTS,
    DEFAULT_MARK_TIMEOUT_SECS, DEFAULT_PROCESSED_LABEL, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
    DEFAULT_SINK_TIMEOUT_SECS, MAIL_EVENT_TYPE,
};
use crate::types::Payload;
use crate::{KiddoError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub queue: QueueSettings,
    pub connectors: Vec<ConnectorConfig>,
    pub calendars: Vec<CalendarSinkConfig>,
    pub notifications: NotificationConfig,
    pub dead_letter: DeadLetterConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;

        if self.queue.max_capacity == Some(0) {
            return Err(KiddoError::Config("queue.max_capacity must be greater than 0".into()));
        }

        let mut seen = HashSet::new();
        for connector in &self.connectors {
            if !seen.insert(connector.source_id()) {
                return Err(KiddoError::Config(format!(
                    "duplicate connector source_id '{}'",
                    connector.source_id()
                )));
            }
        }

        let channels: HashSet<&str> =
            self.notifications.channels.iter().map(ChannelConfig::name).collect();
        for recipient in &self.notifications.recipients {
            if !channels.contains(recipient.channel.as_str()) {
                return Err(KiddoError::Config(format!(
                    "recipient '{}' references unknown channel '{}'",
                    recipient.address, recipient.channel
                )));
            }
        }

        Ok(())
    }
}

/// Orchestrator timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ingest_backoff_secs: u64,
    pub consume_backoff_secs: u64,
    /// Upper bound on waiting for the next item from a connector
    pub fetch_timeout_secs: Option<u64>,
    pub extraction_timeout_secs: Option<u64>,
    pub sink_timeout_secs: Option<u64>,
    pub mark_timeout_secs: Option<u64>,
    pub shutdown_timeout_secs: u64,
    pub default_calendar_id: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ingest_backoff_secs: DEFAULT_INGEST_BACKOFF_SECS,
            consume_backoff_secs: DEFAULT_CONSUME_BACKOFF_SECS,
            fetch_timeout_secs: Some(DEFAULT_FETCH_TIMEOUT_SECS),
            extraction_timeout_secs: Some(DEFAULT_EXTRACTION_TIMEOUT_SECS),
            sink_timeout_secs: Some(DEFAULT_SINK_TIMEOUT_SECS),
            mark_timeout_secs: Some(DEFAULT_MARK_TIMEOUT_SECS),
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            default_calendar_id: DEFAULT_CALENDAR_ID.to_string(),
        }
    }
}

impl PipelineConfig {
    fn validate(&self) -> Result<()> {
        if self.ingest_backoff_secs == 0 {
            return Err(KiddoError::Config("pipeline.ingest_backoff_secs must be > 0".into()));
        }
        if self.consume_backoff_secs == 0 {
            return Err(KiddoError::Config("pipeline.consume_backoff_secs must be > 0".into()));
        }
        if self.default_calendar_id.trim().is_empty() {
            return Err(KiddoError::Config("pipeline.default_calendar_id must not be empty".into()));
        }
        Ok(())
    }
}

/// Event queue tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Queued plus in-flight ceiling; unbounded when absent
    pub max_capacity: Option<usize>,
    /// Fail publishes instead of waiting when the queue is full
    pub reject_when_full: bool,
    /// Requeues allowed before an event is dead-lettered; unlimited when absent
    pub max_redeliveries: Option<u32>,
    /// Ignore publishes for events already queued or in flight
    pub deduplicate: bool,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self { max_capacity: None, reject_when_full: false, max_redeliveries: None, deduplicate: true }
    }
}

/// Source connector selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectorConfig {
    /// Scripted in-memory source
    Memory(MemoryConnectorConfig),
    /// Directory of exported mail messages
    Mailbox(MailboxConnectorConfig),
}

impl ConnectorConfig {
    pub fn source_id(&self) -> &str {
        match self {
            Self::Memory(config) => &config.source_id,
            Self::Mailbox(config) => &config.source_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConnectorConfig {
    pub source_id: String,
    #[serde(default)]
    pub events: Vec<SeedEvent>,
}

/// One event a memory connector yields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedEvent {
    pub event_id: String,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxConnectorConfig {
    #[serde(default = "default_mailbox_source_id")]
    pub source_id: String,
    pub directory: PathBuf,
    #[serde(default = "default_processed_label")]
    pub processed_label: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_mailbox_source_id() -> String {
    MAIL_EVENT_TYPE.to_string()
}

fn default_processed_label() -> String {
    DEFAULT_PROCESSED_LABEL.to_string()
}

const fn default_max_results() -> usize {
    DEFAULT_MAILBOX_MAX_RESULTS
}

/// Calendar sink selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CalendarSinkConfig {
    /// Append VEVENTs to `<directory>/<calendar_id>.ics`
    Ics(IcsCalendarConfig),
    /// Log the event and report it as synced
    Log(LogCalendarConfig),
}

impl CalendarSinkConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Ics(config) => &config.name,
            Self::Log(config) => &config.name,
        }
    }

    /// Calendar id override for this sink
    pub fn calendar_id(&self) -> Option<&str> {
        match self {
            Self::Ics(config) => config.calendar_id.as_deref(),
            Self::Log(config) => config.calendar_id.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcsCalendarConfig {
    #[serde(default = "default_ics_name")]
    pub name: String,
    pub directory: PathBuf,
    #[serde(default)]
    pub calendar_id: Option<String>,
}

fn default_ics_name() -> String {
    "ical".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogCalendarConfig {
    #[serde(default = "default_log_name")]
    pub name: String,
    #[serde(default)]
    pub calendar_id: Option<String>,
}

fn default_log_name() -> String {
    "log".to_string()
}

/// Notification channels and who to notify
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub channels: Vec<ChannelConfig>,
    pub recipients: Vec<RecipientConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientConfig {
    pub channel: String,
    pub address: String,
}

/// Notification channel selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelConfig {
    Email(EmailChannelConfig),
    Sms(SmsChannelConfig),
}

impl ChannelConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Email(config) => &config.name,
            Self::Sms(config) => &config.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailChannelConfig {
    #[serde(default = "default_email_name")]
    pub name: String,
    /// JSON-lines file outgoing messages are appended to
    pub outbox: PathBuf,
    pub from_address: String,
}

fn default_email_name() -> String {
    "email".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsChannelConfig {
    #[serde(default = "default_sms_name")]
    pub name: String,
    pub outbox: PathBuf,
    #[serde(default)]
    pub sender_id: Option<String>,
}

fn default_sms_name() -> String {
    "sms".to_string()
}

/// Where events that exhausted their redeliveries go
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeadLetterConfig {
    #[default]
    Log,
    Jsonl {
        path: PathBuf,
    },
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `compact` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "compact".to_string() }
    }
}
