//! Testing utilities and helpers
//!
//! - **[`async_utils`]**: polling and timeout helpers for async tests

pub mod async_utils;

pub use async_utils::{poll_until, timeout_ok};
