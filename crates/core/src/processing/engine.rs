//! Normalize, analyze, extract

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kiddo_domain::{RawEvent, StructuredEvent};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::error::{ExtractionError, ExtractionResult};
use super::extractor::{DataExtractor, ExtractedFields};
use super::normalizer::{EventNormalizer, NormalizedEvent};
use super::ports::{EventAnalyzer, ExtractionPipeline};

/// Extraction pipeline built from a normalizer, an analyzer and an extractor.
///
/// When the primary analyzer fails or runs out of time and a fallback is set,
/// the fallback's fields are used and the event's metadata is tagged with
/// `analysis_fallback = true`.
pub struct ProcessingEngine {
    normalizer: EventNormalizer,
    analyzer: Arc<dyn EventAnalyzer>,
    fallback: Option<Arc<dyn EventAnalyzer>>,
    extractor: DataExtractor,
    analysis_timeout: Option<Duration>,
}

impl ProcessingEngine {
    pub fn new(analyzer: Arc<dyn EventAnalyzer>) -> Self {
        Self {
            normalizer: EventNormalizer::new(),
            analyzer,
            fallback: None,
            extractor: DataExtractor::new(),
            analysis_timeout: None,
        }
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn EventAnalyzer>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Bound each analyzer call
    #[must_use]
    pub fn with_analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = Some(timeout);
        self
    }

    /// Process several events, keeping the ones that extract cleanly
    pub async fn process_batch(&self, events: &[RawEvent]) -> Vec<StructuredEvent> {
        let mut structured = Vec::with_capacity(events.len());
        for event in events {
            match self.process(event).await {
                Ok(result) => structured.push(result),
                Err(e) => warn!(event_id = %event.display_id(), error = %e, "Skipping event in batch"),
            }
        }
        structured
    }

    async fn analyze_with(
        &self,
        analyzer: &Arc<dyn EventAnalyzer>,
        normalized: &NormalizedEvent,
    ) -> ExtractionResult<ExtractedFields> {
        match self.analysis_timeout {
            Some(limit) => tokio::time::timeout(limit, analyzer.analyze(normalized))
                .await
                .map_err(|_| ExtractionError::Timeout(limit))?,
            None => analyzer.analyze(normalized).await,
        }
    }
}

#[async_trait]
impl ExtractionPipeline for ProcessingEngine {
    #[instrument(skip(self, event), fields(event_id = %event.display_id(), source_id = %event.source_id))]
    async fn process(&self, event: &RawEvent) -> ExtractionResult<StructuredEvent> {
        let mut normalized = self.normalizer.normalize(event);

        let fields = match self.analyze_with(&self.analyzer, &normalized).await {
            Ok(fields) => fields,
            Err(e) => {
                let Some(fallback) = &self.fallback else {
                    return Err(e);
                };
                warn!(error = %e, "Analyzer failed, using fallback");
                normalized.metadata.insert("analysis_fallback".to_string(), Value::Bool(true));
                self.analyze_with(fallback, &normalized).await?
            }
        };

        let structured = self.extractor.extract(&normalized, fields)?;
        debug!(structured_id = %structured.event_id, title = %structured.title, "Event extracted");
        Ok(structured)
    }
}
