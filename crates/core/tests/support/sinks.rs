//! Recording calendar and dead-letter sinks

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use kiddo_core::{CalendarSink, DeadLetterSink};
use kiddo_domain::{CalendarEvent, KiddoError, RawEvent, Result, StructuredEvent};
use parking_lot::Mutex;

#[derive(Default)]
pub struct RecordingCalendar {
    pub created: Mutex<Vec<(String, StructuredEvent)>>,
}

impl RecordingCalendar {
    pub fn created(&self) -> Vec<(String, StructuredEvent)> {
        self.created.lock().clone()
    }
}

#[async_trait]
impl CalendarSink for RecordingCalendar {
    fn name(&self) -> &str {
        "recording"
    }

    async fn create_event(&self, event: &StructuredEvent, calendar_id: &str) -> Result<CalendarEvent> {
        self.created.lock().push((calendar_id.to_string(), event.clone()));
        Ok(CalendarEvent::synced("recording", calendar_id, event.event_id.to_string(), event.event_id))
    }
}

/// Calendar whose `create_event` never returns until released
pub struct StallingCalendar {
    stalled: AtomicBool,
    calls: AtomicUsize,
}

impl StallingCalendar {
    pub fn stalled() -> Self {
        Self { stalled: AtomicBool::new(true), calls: AtomicUsize::new(0) }
    }

    pub fn release(&self) {
        self.stalled.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CalendarSink for StallingCalendar {
    fn name(&self) -> &str {
        "stalling"
    }

    async fn create_event(&self, event: &StructuredEvent, calendar_id: &str) -> Result<CalendarEvent> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(CalendarEvent::synced("stalling", calendar_id, event.event_id.to_string(), event.event_id))
    }
}

/// Records dead-lettered events; the first `failures` deliveries error out
#[derive(Default)]
pub struct RecordingDeadLetters {
    pub delivered: Mutex<Vec<(String, String)>>,
    failures: AtomicUsize,
}

impl RecordingDeadLetters {
    pub fn failing(times: usize) -> Self {
        Self { delivered: Mutex::new(Vec::new()), failures: AtomicUsize::new(times) }
    }

    pub fn ids(&self) -> Vec<String> {
        self.delivered.lock().iter().map(|(id, _)| id.clone()).collect()
    }
}

#[async_trait]
impl DeadLetterSink for RecordingDeadLetters {
    async fn deliver(&self, event: &RawEvent, reason: &str) -> Result<()> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(KiddoError::Sink("dead-letter store unavailable".into()));
        }
        self.delivered.lock().push((event.display_id().to_string(), reason.to_string()));
        Ok(())
    }
}
