//! Observability bootstrap
//!
//! Every crate logs through `tracing`; this module installs the process-wide
//! subscriber that renders those events.

pub mod logging;

pub use logging::{init_logging, LogFormat};
