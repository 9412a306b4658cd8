//! Calendar sink that only logs

use async_trait::async_trait;
use kiddo_core::CalendarSink;
use kiddo_domain::{CalendarEvent, LogCalendarConfig, Result, StructuredEvent};
use tracing::info;

/// Records events in the log instead of a real calendar
pub struct LogCalendarSink {
    name: String,
}

impl LogCalendarSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn from_config(config: &LogCalendarConfig) -> Self {
        Self::new(config.name.clone())
    }
}

#[async_trait]
impl CalendarSink for LogCalendarSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create_event(&self, event: &StructuredEvent, calendar_id: &str) -> Result<CalendarEvent> {
        info!(
            sink = %self.name,
            calendar_id,
            structured_id = %event.event_id,
            title = %event.title,
            start = ?event.anchor_time(),
            source = %event.source_reference,
            "Calendar event"
        );
        Ok(CalendarEvent::synced(&self.name, calendar_id, event.event_id.to_string(), event.event_id))
    }
}
