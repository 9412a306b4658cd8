//! Calendar sinks and their factory

mod ics;
mod log;

use std::sync::Arc;

use kiddo_core::CalendarSink;
use kiddo_domain::CalendarSinkConfig;

pub use self::ics::{render_vevent, IcsCalendarSink};
pub use self::log::LogCalendarSink;

/// A calendar sink paired with the calendar id events are created in
pub struct CalendarTarget {
    pub sink: Arc<dyn CalendarSink>,
    pub calendar_id: String,
}

/// Create one sink per config entry; entries without a calendar id use
/// `default_calendar_id`
pub fn build_calendar_sinks(
    configs: &[CalendarSinkConfig],
    default_calendar_id: &str,
) -> Vec<CalendarTarget> {
    configs
        .iter()
        .map(|config| {
            let sink: Arc<dyn CalendarSink> = match config {
                CalendarSinkConfig::Ics(ics) => Arc::new(IcsCalendarSink::from_config(ics)),
                CalendarSinkConfig::Log(log) => Arc::new(LogCalendarSink::from_config(log)),
            };
            let calendar_id = config.calendar_id().unwrap_or(default_calendar_id).to_string();
            CalendarTarget { sink, calendar_id }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use kiddo_domain::{IcsCalendarConfig, LogCalendarConfig};

    use super::*;

    #[test]
    fn test_calendar_id_falls_back_to_default() {
        let configs = vec![
            CalendarSinkConfig::Ics(IcsCalendarConfig {
                name: "ical".to_string(),
                directory: "/tmp/calendars".into(),
                calendar_id: Some("school".to_string()),
            }),
            CalendarSinkConfig::Log(LogCalendarConfig { name: "log".to_string(), calendar_id: None }),
        ];

        let targets = build_calendar_sinks(&configs, "primary");
        let summary: Vec<(&str, &str)> =
            targets.iter().map(|t| (t.sink.name(), t.calendar_id.as_str())).collect();
        assert_eq!(summary, vec![("ical", "school"), ("log", "primary")]);
    }
}
