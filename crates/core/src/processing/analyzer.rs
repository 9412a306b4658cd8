//! Rule-based analyzer used when no model-backed analyzer is configured

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use kiddo_domain::constants::{PROMPT_TASK_MAIL_TO_CALENDAR, PROMPT_TASK_SCHOOL_EVENT};
use kiddo_domain::utils::title::{clean_subject, first_line, truncate_title};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::error::ExtractionResult;
use super::extractor::ExtractedFields;
use super::normalizer::NormalizedEvent;
use super::ports::EventAnalyzer;

const NAIVE_OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

static TIME_RANGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\s*(?:-|–|do)\s*([01]?\d|2[0-3]):([0-5]\d)\b")
        .expect("TIME_RANGE_REGEX should compile - this is a bug")
});

static TWELVE_HOUR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(1[0-2]|0?[1-9])(?::([0-5]\d))?\s*(am|pm)\b")
        .expect("TWELVE_HOUR_REGEX should compile - this is a bug")
});

static CLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").expect("CLOCK_REGEX should compile - this is a bug")
});

static ISO_DATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("ISO_DATE_REGEX should compile - this is a bug")
});

static DOTTED_DATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.(\d{4})\b")
        .expect("DOTTED_DATE_REGEX should compile - this is a bug")
});

/// Derives event fields from subject and body text with pattern matching.
///
/// Title comes from the cleaned subject or the first content line. Dates are
/// read as `YYYY-MM-DD` or `DD.MM.YYYY`; times as `HH:MM`, `HH:MM-HH:MM` or
/// `10am`/`2:30pm`. A time without a date is anchored to the event timestamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn fields(event: &NormalizedEvent) -> ExtractedFields {
        let subject = event.subject.as_deref().map(clean_subject).filter(|s| !s.is_empty());
        let title = subject
            .map(str::to_string)
            .or_else(|| first_line(&event.raw_content).map(str::to_string))
            .map(|title| truncate_title(&title));

        let text = match &subject {
            Some(subject) => format!("{subject}\n{}", event.raw_content),
            None => event.raw_content.clone(),
        };

        let explicit_date = find_date(&text);
        let date = explicit_date.unwrap_or_else(|| event.timestamp.date_naive());

        let mut fields = ExtractedFields {
            title,
            event_type: event_type_for(event.prompt_task.as_deref()),
            description: Some(event.raw_content.clone()).filter(|body| !body.trim().is_empty()),
            participants: event.from_email.iter().filter(|from| !from.is_empty()).cloned().collect(),
            ..Default::default()
        };

        if let Some((start, end)) = find_time_range(&text) {
            fields.start_time = Some(date.and_time(start).format(NAIVE_OUTPUT_FORMAT).to_string());
            fields.end_time = Some(date.and_time(end).format(NAIVE_OUTPUT_FORMAT).to_string());
        } else if let Some(start) = find_time(&text) {
            fields.start_time = Some(date.and_time(start).format(NAIVE_OUTPUT_FORMAT).to_string());
        } else if let Some(day) = explicit_date {
            fields.due_date = Some(day.format("%Y-%m-%d").to_string());
        }

        fields
    }
}

#[async_trait]
impl EventAnalyzer for HeuristicAnalyzer {
    async fn analyze(&self, event: &NormalizedEvent) -> ExtractionResult<ExtractedFields> {
        Ok(Self::fields(event))
    }
}

fn event_type_for(prompt_task: Option<&str>) -> Option<String> {
    match prompt_task {
        Some(PROMPT_TASK_MAIL_TO_CALENDAR) => Some("calendar_request".to_string()),
        Some(PROMPT_TASK_SCHOOL_EVENT) => Some("school_event".to_string()),
        _ => None,
    }
}

fn number(caps: &Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}

fn find_date(text: &str) -> Option<NaiveDate> {
    let iso = ISO_DATE_REGEX.captures_iter(text).find_map(|caps| {
        let year = caps.get(1)?.as_str().parse().ok()?;
        NaiveDate::from_ymd_opt(year, number(&caps, 2)?, number(&caps, 3)?)
    });

    iso.or_else(|| {
        DOTTED_DATE_REGEX.captures_iter(text).find_map(|caps| {
            let year = caps.get(3)?.as_str().parse().ok()?;
            NaiveDate::from_ymd_opt(year, number(&caps, 2)?, number(&caps, 1)?)
        })
    })
}

fn find_time_range(text: &str) -> Option<(NaiveTime, NaiveTime)> {
    let caps = TIME_RANGE_REGEX.captures(text)?;
    let start = NaiveTime::from_hms_opt(number(&caps, 1)?, number(&caps, 2)?, 0)?;
    let end = NaiveTime::from_hms_opt(number(&caps, 3)?, number(&caps, 4)?, 0)?;
    (start < end).then_some((start, end))
}

fn find_time(text: &str) -> Option<NaiveTime> {
    if let Some(caps) = TWELVE_HOUR_REGEX.captures(text) {
        let hour = number(&caps, 1)?;
        let minute = number(&caps, 2).unwrap_or(0);
        let pm = caps.get(3)?.as_str().eq_ignore_ascii_case("pm");
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (hour, true) => hour + 12,
            (hour, false) => hour,
        };
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    let caps = CLOCK_REGEX.captures(text)?;
    NaiveTime::from_hms_opt(number(&caps, 1)?, number(&caps, 2)?, 0)
}
