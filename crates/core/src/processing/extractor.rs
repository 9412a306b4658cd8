//! Builds validated structured events from analyzer output

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use kiddo_domain::constants::{
    DEFAULT_ALERT_BEFORE_MINUTES, UNKNOWN_EVENT_TYPE, UNTITLED_EVENT_TITLE,
};
use kiddo_domain::{Recurrence, StructuredEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::error::{ExtractionError, ExtractionResult};
use super::normalizer::NormalizedEvent;

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

/// Fields proposed by an analyzer, before parsing and validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub event_type: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub participants: Vec<String>,
    pub location: Option<String>,
    pub priority: Option<String>,
    pub alert_before_minutes: Option<Value>,
    pub recurrence: Option<String>,
}

/// Turns normalized events plus analyzer output into [`StructuredEvent`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct DataExtractor;

impl DataExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Build and validate a structured event.
    ///
    /// Unparseable optional fields are dropped; a missing title or an
    /// inverted time window fails extraction.
    pub fn extract(
        &self,
        normalized: &NormalizedEvent,
        fields: ExtractedFields,
    ) -> ExtractionResult<StructuredEvent> {
        let title = fields
            .title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| UNTITLED_EVENT_TITLE.to_string());

        let mut metadata = normalized.metadata.clone();
        metadata.insert("llm_extracted".to_string(), Value::Bool(true));
        metadata.insert(
            "extraction_timestamp".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        if let Some(source_event_id) = &normalized.event_id {
            metadata.insert("source_event_id".to_string(), Value::String(source_event_id.clone()));
        }

        let structured = StructuredEvent {
            event_id: Uuid::new_v4(),
            event_type: fields
                .event_type
                .filter(|kind| !kind.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_EVENT_TYPE.to_string()),
            title,
            description: fields.description,
            due_date: parse_field("due_date", fields.due_date.as_deref()),
            start_time: parse_field("start_time", fields.start_time.as_deref()),
            end_time: parse_field("end_time", fields.end_time.as_deref()),
            participants: fields.participants,
            location: fields.location,
            priority: fields.priority,
            source_reference: normalized.source_id.clone(),
            metadata,
            alert_before_minutes: parse_alert(fields.alert_before_minutes.as_ref()),
            recurrence: fields.recurrence.as_deref().and_then(parse_recurrence),
        };

        validate(&structured)?;
        Ok(structured)
    }
}

fn validate(event: &StructuredEvent) -> ExtractionResult<()> {
    if event.title.trim().is_empty() {
        return Err(ExtractionError::MissingField("title"));
    }

    if let (Some(start), Some(end)) = (event.start_time, event.end_time) {
        if start >= end {
            return Err(ExtractionError::invalid(
                "time window",
                format!("start {start} is not before end {end}"),
            ));
        }
    }

    Ok(())
}

fn parse_field(field: &'static str, value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?;
    let parsed = parse_datetime(value);
    if parsed.is_none() {
        debug!(field, value, "Ignoring unparseable datetime");
    }
    parsed
}

/// RFC 3339, naive date-times (taken as UTC) or a bare date at midnight
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Integer or numeric string; anything else falls back to the default
fn parse_alert(value: Option<&Value>) -> u32 {
    let minutes = match value {
        Some(Value::Number(number)) => number.as_u64(),
        Some(Value::String(text)) => text.trim().parse::<u64>().ok(),
        _ => None,
    };

    minutes
        .and_then(|minutes| u32::try_from(minutes).ok())
        .unwrap_or(DEFAULT_ALERT_BEFORE_MINUTES)
}

fn parse_recurrence(value: &str) -> Option<Recurrence> {
    value.trim().parse().ok()
}
