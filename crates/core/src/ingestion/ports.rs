//! Port interfaces for event sources

use async_trait::async_trait;
use futures::stream::BoxStream;
use kiddo_domain::{RawEvent, Result};

/// Lazy sequence of raw events. Finite per fetch for connectors, unbounded for
/// queue consumers.
pub type EventStream = BoxStream<'static, Result<RawEvent>>;

/// Capability set every event source provides
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Identifier stamped on every event this connector yields
    fn source_id(&self) -> &str;

    /// Establish whatever session the source needs
    async fn connect(&self) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    /// Start a fresh pass over the source.
    ///
    /// The stream is finite; callers fetch again to pick up new items.
    /// Connectors are expected to leave already-processed items out.
    async fn fetch_events(&self) -> Result<EventStream>;

    async fn health_check(&self) -> Result<bool>;

    /// Whether this item was already handled in an earlier run
    async fn is_processed(&self, _event: &RawEvent) -> Result<bool> {
        Ok(false)
    }

    /// Record the item as handled so later fetches skip it
    async fn mark_as_processed(&self, _event: &RawEvent) -> Result<bool> {
        Ok(true)
    }
}
