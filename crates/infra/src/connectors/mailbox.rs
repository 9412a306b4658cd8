//! Mailbox directory source
//!
//! Reads mail messages exported as one JSON document per file. A message
//! counts as processed when it carries the processed label or its event id is
//! listed in the directory's ledger file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use kiddo_core::{EventStream, SourceConnector};
use kiddo_domain::constants::{MAIL_EVENT_ID_PREFIX, MAIL_EVENT_TYPE, PROCESSED_LEDGER_FILE};
use kiddo_domain::{KiddoError, MailboxConnectorConfig, Payload, RawEvent, Result};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::errors::InfraError;

/// One exported message
#[derive(Debug, Clone, Deserialize)]
pub struct MailMessage {
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl MailMessage {
    pub fn event_id(&self) -> String {
        format!("{MAIL_EVENT_ID_PREFIX}{}", self.id)
    }

    /// Message date, accepting RFC 2822 headers and RFC 3339 stamps
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.date.as_deref()?.trim();
        DateTime::parse_from_rfc2822(raw)
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .ok()
            .map(|date| date.with_timezone(&Utc))
    }

    fn into_raw_event(self, source_id: &str) -> RawEvent {
        let timestamp = self.received_at().unwrap_or_else(Utc::now);
        let event_id = self.event_id();

        let mut payload = Payload::new();
        payload.insert("subject".into(), Value::String(self.subject));
        payload.insert("from".into(), Value::String(self.from));
        payload.insert("to".into(), Value::String(self.to));
        payload.insert("body".into(), Value::String(self.body));
        payload.insert("snippet".into(), Value::String(self.snippet));
        payload.insert(
            "labels".into(),
            Value::Array(self.labels.into_iter().map(Value::String).collect()),
        );

        RawEvent::new(source_id, payload)
            .with_event_id(event_id)
            .with_timestamp(timestamp)
            .with_type(MAIL_EVENT_TYPE)
            .with_metadata("message_id", Value::String(self.id))
    }
}

/// Source reading `*.json` message exports from a directory
pub struct MailboxConnector {
    config: MailboxConnectorConfig,
    ledger: Mutex<HashSet<String>>,
    ledger_writer: tokio::sync::Mutex<()>,
    connected: AtomicBool,
}

impl MailboxConnector {
    pub fn new(config: MailboxConnectorConfig) -> Self {
        Self {
            config,
            ledger: Mutex::new(HashSet::new()),
            ledger_writer: tokio::sync::Mutex::new(()),
            connected: AtomicBool::new(false),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    fn ledger_path(&self) -> PathBuf {
        self.config.directory.join(PROCESSED_LEDGER_FILE)
    }

    fn is_recorded(&self, event_id: &str) -> bool {
        self.ledger.lock().contains(event_id)
    }

    async fn load_ledger(&self) -> Result<usize> {
        let contents = match tokio::fs::read_to_string(self.ledger_path()).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(InfraError::from(e).into()),
        };

        let mut ledger = self.ledger.lock();
        ledger.extend(
            contents.lines().map(str::trim).filter(|line| !line.is_empty()).map(str::to_string),
        );
        Ok(ledger.len())
    }

    /// Message files in name order
    async fn message_files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.config.directory)
            .await
            .map_err(|e| KiddoError::Connector(format!("cannot read mailbox: {e}")))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(InfraError::from)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn read_message(path: &Path) -> Option<MailMessage> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable message");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(message) => Some(message),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping malformed message");
                None
            }
        }
    }

    fn is_skipped(&self, message: &MailMessage) -> bool {
        message.labels.iter().any(|label| label == &self.config.processed_label)
            || self.is_recorded(&message.event_id())
    }
}

#[async_trait]
impl SourceConnector for MailboxConnector {
    fn source_id(&self) -> &str {
        &self.config.source_id
    }

    #[instrument(skip(self), fields(source_id = %self.config.source_id))]
    async fn connect(&self) -> Result<()> {
        let metadata = tokio::fs::metadata(&self.config.directory).await.map_err(|e| {
            KiddoError::Connector(format!(
                "mailbox {} unavailable: {e}",
                self.config.directory.display()
            ))
        })?;
        if !metadata.is_dir() {
            return Err(KiddoError::Connector(format!(
                "mailbox {} is not a directory",
                self.config.directory.display()
            )));
        }

        let recorded = self.load_ledger().await?;
        self.connected.store(true, Ordering::SeqCst);
        info!(recorded, "Mailbox connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    #[instrument(skip(self), fields(source_id = %self.config.source_id))]
    async fn fetch_events(&self) -> Result<EventStream> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(KiddoError::Connector(format!(
                "{} is not connected",
                self.config.source_id
            )));
        }

        let mut events = Vec::new();
        for path in self.message_files().await? {
            if events.len() >= self.config.max_results {
                break;
            }
            let Some(message) = Self::read_message(&path).await else {
                continue;
            };
            if self.is_skipped(&message) {
                continue;
            }
            events.push(Ok(message.into_raw_event(&self.config.source_id)));
        }

        debug!(count = events.len(), "Fetched unprocessed messages");
        Ok(stream::iter(events).boxed())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(tokio::fs::metadata(&self.config.directory).await.is_ok_and(|m| m.is_dir()))
    }

    async fn is_processed(&self, event: &RawEvent) -> Result<bool> {
        let labelled = event
            .raw_payload
            .get("labels")
            .and_then(Value::as_array)
            .is_some_and(|labels| {
                labels.iter().any(|label| label.as_str() == Some(self.config.processed_label.as_str()))
            });
        Ok(labelled || event.event_id.as_deref().is_some_and(|id| self.is_recorded(id)))
    }

    #[instrument(skip(self, event), fields(event_id = %event.display_id()))]
    async fn mark_as_processed(&self, event: &RawEvent) -> Result<bool> {
        let Some(id) = event.event_id.as_deref() else {
            return Ok(false);
        };

        let _writer = self.ledger_writer.lock().await;
        if self.is_recorded(id) {
            return Ok(true);
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.ledger_path())
            .await
            .map_err(InfraError::from)?;
        file.write_all(format!("{id}\n").as_bytes()).await.map_err(InfraError::from)?;
        file.flush().await.map_err(InfraError::from)?;

        self.ledger.lock().insert(id.to_string());
        Ok(true)
    }
}
