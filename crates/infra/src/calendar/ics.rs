//! iCalendar file sink
//!
//! Each calendar id maps to one `.ics` file holding a single VCALENDAR. New
//! events are inserted before the closing `END:VCALENDAR` line.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use kiddo_core::CalendarSink;
use kiddo_domain::constants::DEFAULT_EVENT_DURATION_MINUTES;
use kiddo_domain::{CalendarEvent, IcsCalendarConfig, Result, StructuredEvent};
use tracing::{debug, instrument};

use crate::errors::InfraError;

const CALENDAR_HEADER: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Kiddo//Event Pipeline//EN\r\nCALSCALE:GREGORIAN\r\n";
const CALENDAR_FOOTER: &str = "END:VCALENDAR\r\n";
const ICS_DATETIME: &str = "%Y%m%dT%H%M%SZ";
const MAX_LINE_OCTETS: usize = 75;

/// Writes events into `<directory>/<calendar_id>.ics`
pub struct IcsCalendarSink {
    name: String,
    directory: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl IcsCalendarSink {
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self { name: name.into(), directory: directory.into(), write_lock: tokio::sync::Mutex::new(()) }
    }

    pub fn from_config(config: &IcsCalendarConfig) -> Self {
        Self::new(config.name.clone(), config.directory.clone())
    }

    /// File backing a calendar id
    pub fn calendar_path(&self, calendar_id: &str) -> PathBuf {
        let file: String = calendar_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.directory.join(format!("{file}.ics"))
    }

    async fn insert_event(&self, path: &Path, vevent: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        tokio::fs::create_dir_all(&self.directory).await.map_err(InfraError::from)?;
        let existing = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(InfraError::from(e).into()),
        };

        let mut calendar = match existing.rfind(CALENDAR_FOOTER) {
            Some(end) => existing[..end].to_string(),
            None => CALENDAR_HEADER.to_string(),
        };
        calendar.push_str(vevent);
        calendar.push_str(CALENDAR_FOOTER);

        tokio::fs::write(path, calendar).await.map_err(InfraError::from)?;
        Ok(())
    }
}

#[async_trait]
impl CalendarSink for IcsCalendarSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, event), fields(sink = %self.name, structured_id = %event.event_id))]
    async fn create_event(&self, event: &StructuredEvent, calendar_id: &str) -> Result<CalendarEvent> {
        let Some(vevent) = render_vevent(event, Utc::now()) else {
            return Ok(CalendarEvent::failed(
                &self.name,
                calendar_id,
                event.event_id,
                "event has neither a start time nor a due date",
            ));
        };

        let path = self.calendar_path(calendar_id);
        self.insert_event(&path, &vevent).await?;
        debug!(path = %path.display(), "Event written to calendar file");

        Ok(CalendarEvent::synced(&self.name, calendar_id, event_uid(event), event.event_id))
    }
}

fn event_uid(event: &StructuredEvent) -> String {
    format!("{}@kiddo", event.event_id)
}

/// VEVENT block for an event, or `None` when it has nothing to schedule on
pub fn render_vevent(event: &StructuredEvent, stamp: DateTime<Utc>) -> Option<String> {
    let start = event.anchor_time()?;
    let end = event
        .effective_end()
        .filter(|end| *end > start)
        .unwrap_or_else(|| start + Duration::minutes(DEFAULT_EVENT_DURATION_MINUTES));

    let mut lines = vec![
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}", event_uid(event)),
        format!("DTSTAMP:{}", stamp.format(ICS_DATETIME)),
        format!("DTSTART:{}", start.format(ICS_DATETIME)),
        format!("DTEND:{}", end.format(ICS_DATETIME)),
        format!("SUMMARY:{}", escape_text(&event.title)),
    ];
    if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("DESCRIPTION:{}", escape_text(description)));
    }
    if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
        lines.push(format!("LOCATION:{}", escape_text(location)));
    }
    for attendee in event.participants.iter().filter(|p| p.contains('@')) {
        lines.push(format!("ATTENDEE:mailto:{}", attendee.trim()));
    }
    if let Some(recurrence) = event.recurrence {
        lines.push(format!("RRULE:FREQ={}", recurrence.rrule_freq()));
    }
    lines.extend([
        "BEGIN:VALARM".to_string(),
        "ACTION:DISPLAY".to_string(),
        format!("DESCRIPTION:{}", escape_text(&event.title)),
        format!("TRIGGER:-PT{}M", event.alert_before_minutes),
        "END:VALARM".to_string(),
        "END:VEVENT".to_string(),
    ]);

    let mut block = String::new();
    for line in lines {
        block.push_str(&fold_line(&line));
        block.push_str("\r\n");
    }
    Some(block)
}

/// Escape a TEXT property value
fn escape_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ';' => escaped.push_str("\\;"),
            ',' => escaped.push_str("\\,"),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    escaped
}

/// Fold a content line at 75 octets without splitting a UTF-8 sequence
fn fold_line(line: &str) -> String {
    if line.len() <= MAX_LINE_OCTETS {
        return line.to_string();
    }

    let mut folded = String::with_capacity(line.len() + line.len() / MAX_LINE_OCTETS * 3);
    let mut width = 0;
    for c in line.chars() {
        if width + c.len_utf8() > MAX_LINE_OCTETS {
            folded.push_str("\r\n ");
            width = 1;
        }
        folded.push(c);
        width += c.len_utf8();
    }
    folded
}
