//! Sink fan-out: calendars, notification channels and dead letters

pub mod error;
pub mod fanout;
pub mod notification;
pub mod ports;

pub use error::{SinkError, SinkResult};
pub use fanout::{FanoutReport, SinkFailure, SinkFanout};
pub use notification::{
    render_message, render_sms_summary, NotificationEngine, Recipient, SMS_MAX_LENGTH,
};
pub use ports::{CalendarSink, DeadLetterSink, NotificationChannel};
