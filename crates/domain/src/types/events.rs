//! Raw and structured events

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::constants::{
    DEFAULT_ALERT_BEFORE_MINUTES, DEFAULT_EVENT_DURATION_MINUTES, UNKNOWN_EVENT_TYPE,
};
use crate::impl_domain_status_conversions;
use crate::{KiddoError, Result};

/// Opaque key/value mapping carried by events
pub type Payload = serde_json::Map<String, Value>;

/// An unprocessed item pulled from a source.
///
/// `event_id` must be stable across repeated fetches of the same source item;
/// the queue and the connector's idempotency marking both key on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub source_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub raw_payload: Payload,
    #[serde(default)]
    pub source_metadata: Payload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl RawEvent {
    /// New event stamped with the current time
    pub fn new(source_id: impl Into<String>, raw_payload: Payload) -> Self {
        Self {
            source_id: source_id.into(),
            timestamp: Utc::now(),
            raw_payload,
            source_metadata: Payload::new(),
            event_id: None,
        }
    }

    #[must_use]
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the `type` discriminator used for routing
    #[must_use]
    pub fn with_type(self, event_type: impl Into<String>) -> Self {
        self.with_metadata("type", Value::String(event_type.into()))
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.source_metadata.insert(key.into(), value);
        self
    }

    /// Routing discriminator from `source_metadata.type`
    pub fn event_type(&self) -> Option<&str> {
        self.source_metadata.get("type").and_then(Value::as_str)
    }

    /// String field from the raw payload
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.raw_payload.get(key).and_then(Value::as_str)
    }

    /// Event id or a placeholder for log lines
    pub fn display_id(&self) -> &str {
        self.event_id.as_deref().unwrap_or("<unassigned>")
    }
}

/// How a structured event repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl_domain_status_conversions!(Recurrence {
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
    Yearly => "yearly",
});

impl Recurrence {
    /// iCalendar `FREQ` value
    pub fn rrule_freq(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }
}

/// The enriched, calendar-ready representation produced by extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredEvent {
    /// Freshly generated; never the raw event's id
    pub event_id: Uuid,
    pub event_type: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub participants: Vec<String>,
    pub location: Option<String>,
    pub priority: Option<String>,
    /// `source_id` of the originating connector
    pub source_reference: String,
    #[serde(default)]
    pub metadata: Payload,
    pub alert_before_minutes: u32,
    pub recurrence: Option<Recurrence>,
}

impl StructuredEvent {
    /// New event with defaults for everything except title and source
    pub fn new(title: impl Into<String>, source_reference: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: UNKNOWN_EVENT_TYPE.to_string(),
            title: title.into(),
            description: None,
            due_date: None,
            start_time: None,
            end_time: None,
            participants: Vec::new(),
            location: None,
            priority: None,
            source_reference: source_reference.into(),
            metadata: Payload::new(),
            alert_before_minutes: DEFAULT_ALERT_BEFORE_MINUTES,
            recurrence: None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// End time, or start plus the default duration when a window is needed
    pub fn effective_end(&self) -> Option<DateTime<Utc>> {
        self.end_time
            .or_else(|| self.start_time.map(|start| start + Duration::minutes(DEFAULT_EVENT_DURATION_MINUTES)))
    }

    /// The moment that best represents when the event happens
    pub fn anchor_time(&self) -> Option<DateTime<Utc>> {
        self.start_time.or(self.due_date)
    }

    pub fn alert_lead_time(&self) -> Duration {
        Duration::minutes(i64::from(self.alert_before_minutes))
    }

    /// Check the invariants every structured event must hold
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(KiddoError::InvalidInput("event title is required".to_string()));
        }

        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            if start >= end {
                return Err(KiddoError::InvalidInput(format!(
                    "start time {start} must be before end time {end}"
                )));
            }
        }

        Ok(())
    }
}
