//! Domain types and models
//!
//! - [`events`]: raw and structured events flowing through the pipeline
//! - [`calendar`]: calendar sync records
//! - [`notification`]: notification delivery records

pub mod calendar;
pub mod events;
pub mod notification;

pub use calendar::{CalendarEvent, SyncStatus};
pub use events::{Payload, RawEvent, Recurrence, StructuredEvent};
pub use notification::{Notification, NotificationStatus};
