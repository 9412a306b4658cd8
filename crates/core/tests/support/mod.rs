//! Shared test helpers for `kiddo-core` integration tests.
//!
//! Lightweight in-memory collaborators that record every call so tests can
//! assert on the ack/nack protocol instead of wiring real adapters.

#![allow(dead_code)]

pub mod connectors;
pub mod pipeline;
pub mod queue;
pub mod sinks;

use kiddo_domain::{Payload, RawEvent};
use serde_json::json;

/// Raw event with a `body` payload and a stable id
pub fn raw_event(source_id: &str, event_id: &str, body: &str) -> RawEvent {
    let mut payload = Payload::new();
    payload.insert("body".to_string(), json!(body));
    RawEvent::new(source_id, payload).with_event_id(event_id)
}
