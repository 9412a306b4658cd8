//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Pipeline timing
pub const DEFAULT_INGEST_BACKOFF_SECS: u64 = 5;
pub const DEFAULT_CONSUME_BACKOFF_SECS: u64 = 1;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SINK_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MARK_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DISCONNECT_TIMEOUT_SECS: u64 = 10;

// Structured event defaults
pub const DEFAULT_ALERT_BEFORE_MINUTES: u32 = 15;
pub const DEFAULT_EVENT_DURATION_MINUTES: i64 = 60;
pub const UNTITLED_EVENT_TITLE: &str = "Untitled Event";
pub const UNKNOWN_EVENT_TYPE: &str = "unknown";
pub const MAX_TITLE_LENGTH: usize = 120;
pub const TITLE_TRUNCATE_SUFFIX: &str = "...";

// Sinks
pub const DEFAULT_CALENDAR_ID: &str = "primary";

// Sources
pub const MAIL_EVENT_TYPE: &str = "gmail";
pub const MAIL_EVENT_ID_PREFIX: &str = "mail_";
pub const DEFAULT_PROCESSED_LABEL: &str = "kiddo/processed";
pub const DEFAULT_MAILBOX_MAX_RESULTS: usize = 100;
pub const PROCESSED_LEDGER_FILE: &str = ".processed";

/// Prefix for ids minted for events published without one
pub const GENERATED_EVENT_ID_PREFIX: &str = "ingest_";

// Extraction routing hints
pub const PROMPT_TASK_MAIL_TO_CALENDAR: &str = "extract_mail_to_calendar";
pub const PROMPT_TASK_SCHOOL_EVENT: &str = "extract_school_event";
pub const MAIL_TO_CALENDAR_PHRASE: &str = "dodaj do kalendarza";
pub const SCHOOL_SENDER_INDICATORS: &[&str] = &[
    "szkola",
    "szkoła",
    "przedszkole",
    "edu.pl",
    "sp",
    "gimnazjum",
    "liceum",
    "nauczyciel",
    "dyrektor",
    "sekretariat",
];
