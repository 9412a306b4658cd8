//! # Kiddo Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - Configuration loading (files plus `KIDDO_*` overrides)
//! - The in-memory event queue
//! - Source connectors (in-memory, mailbox directory)
//! - Calendar sinks (ICS files, log)
//! - Notification channels (email and SMS outboxes)
//! - Dead-letter sinks
//!
//! ## Architecture
//! - Implements traits defined in `kiddo-core`
//! - Depends on `kiddo-common`, `kiddo-domain` and `kiddo-core`
//! - Contains all "impure" code (filesystem I/O)

pub mod calendar;
pub mod config;
pub mod connectors;
pub mod dead_letter;
pub mod errors;
pub mod jsonl;
pub mod notifications;
pub mod pipeline;
pub mod queue;

// Re-export commonly used items
pub use calendar::{build_calendar_sinks, CalendarTarget, IcsCalendarSink, LogCalendarSink};
pub use connectors::{build_connectors, MailboxConnector, MemoryConnector};
pub use dead_letter::{build_dead_letter_sink, JsonlDeadLetterSink, LogDeadLetterSink};
pub use errors::InfraError;
pub use notifications::{build_notification_engine, build_recipients, EmailChannel, SmsChannel};
pub use pipeline::{build_components, build_fanout, PipelineComponents};
pub use queue::InMemoryEventQueue;
