//! Canonical view of a raw event, ready for analysis

use chrono::{DateTime, Utc};
use kiddo_domain::constants::{
    MAIL_EVENT_TYPE, MAIL_TO_CALENDAR_PHRASE, PROMPT_TASK_MAIL_TO_CALENDAR,
    PROMPT_TASK_SCHOOL_EVENT, SCHOOL_SENDER_INDICATORS,
};
use kiddo_domain::{Payload, RawEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload keys searched, in order, for the event's text
const CONTENT_FIELDS: [&str; 5] = ["body", "content", "text", "message", "description"];

/// Source-independent record the analyzer works from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub source_id: String,
    pub event_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub event_type: Option<String>,
    pub raw_content: String,
    pub subject: Option<String>,
    /// Lower-cased sender address for mail events
    pub from_email: Option<String>,
    /// Which extraction task fits this event, when one can be told apart
    pub prompt_task: Option<String>,
    pub metadata: Payload,
}

/// Normalizes raw events from any source into [`NormalizedEvent`]
#[derive(Debug, Clone, Copy, Default)]
pub struct EventNormalizer;

impl EventNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(&self, event: &RawEvent) -> NormalizedEvent {
        let mut normalized = NormalizedEvent {
            source_id: event.source_id.clone(),
            event_id: event.event_id.clone(),
            timestamp: event.timestamp,
            event_type: event.event_type().map(str::to_string),
            raw_content: extract_content(&event.raw_payload),
            subject: None,
            from_email: None,
            prompt_task: None,
            metadata: event.source_metadata.clone(),
        };

        if is_mail(normalized.event_type.as_deref()) {
            let subject = event.payload_str("subject").unwrap_or_default().to_string();
            let from_email = event.payload_str("from").unwrap_or_default().to_lowercase();

            normalized.prompt_task = if subject.to_lowercase().contains(MAIL_TO_CALENDAR_PHRASE) {
                Some(PROMPT_TASK_MAIL_TO_CALENDAR.to_string())
            } else if is_school_sender(&from_email) {
                Some(PROMPT_TASK_SCHOOL_EVENT.to_string())
            } else {
                None
            };

            normalized.subject = Some(subject);
            normalized.from_email = Some(from_email);
        }

        if let Some(task) = &normalized.prompt_task {
            normalized.metadata.insert("prompt_task".to_string(), Value::String(task.clone()));
        }

        normalized
    }
}

fn is_mail(event_type: Option<&str>) -> bool {
    matches!(event_type, Some(kind) if kind == MAIL_EVENT_TYPE || kind == "mail")
}

fn is_school_sender(from_email: &str) -> bool {
    SCHOOL_SENDER_INDICATORS.iter().any(|indicator| from_email.contains(indicator))
}

/// First non-empty content field, else the whole payload as JSON
fn extract_content(payload: &Payload) -> String {
    CONTENT_FIELDS
        .iter()
        .filter_map(|field| payload.get(*field))
        .find_map(|value| match value {
            Value::Null => None,
            Value::String(text) if text.trim().is_empty() => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| Value::Object(payload.clone()).to_string())
}
