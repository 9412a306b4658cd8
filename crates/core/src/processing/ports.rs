//! Port interfaces for the extraction step

use async_trait::async_trait;
use kiddo_domain::{RawEvent, StructuredEvent};

use super::error::ExtractionResult;
use super::extractor::ExtractedFields;
use super::normalizer::NormalizedEvent;

/// Turns a raw event into a structured event
#[async_trait]
pub trait ExtractionPipeline: Send + Sync {
    async fn process(&self, event: &RawEvent) -> ExtractionResult<StructuredEvent>;
}

/// The enrichment step: reads normalized content and proposes event fields.
///
/// Implementations range from local heuristics to a language model call.
#[async_trait]
pub trait EventAnalyzer: Send + Sync {
    async fn analyze(&self, event: &NormalizedEvent) -> ExtractionResult<ExtractedFields>;
}
