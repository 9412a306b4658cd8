//! Extraction pipeline that fails on demand

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kiddo_core::{ExtractionError, ExtractionPipeline, HeuristicAnalyzer, ProcessingEngine};
use kiddo_domain::{RawEvent, StructuredEvent};
use parking_lot::Mutex;

/// Heuristic extraction that fails a set number of times per event id.
/// `usize::MAX` failures means the event never extracts.
pub struct FlakyPipeline {
    engine: ProcessingEngine,
    failures: Mutex<HashMap<String, usize>>,
    pub attempts: Mutex<Vec<String>>,
    pub extracted: Mutex<Vec<StructuredEvent>>,
}

impl FlakyPipeline {
    pub fn new() -> Self {
        Self {
            engine: ProcessingEngine::new(Arc::new(HeuristicAnalyzer::new())),
            failures: Mutex::new(HashMap::new()),
            attempts: Mutex::new(Vec::new()),
            extracted: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(self, event_id: &str, times: usize) -> Self {
        self.failures.lock().insert(event_id.to_string(), times);
        self
    }

    pub fn attempts_for(&self, event_id: &str) -> usize {
        self.attempts.lock().iter().filter(|id| *id == event_id).count()
    }

    pub fn extracted(&self) -> Vec<StructuredEvent> {
        self.extracted.lock().clone()
    }
}

#[async_trait]
impl ExtractionPipeline for FlakyPipeline {
    async fn process(&self, event: &RawEvent) -> Result<StructuredEvent, ExtractionError> {
        let id = event.display_id().to_string();
        self.attempts.lock().push(id.clone());

        {
            let mut failures = self.failures.lock();
            if let Some(left) = failures.get_mut(&id) {
                if *left > 0 {
                    if *left != usize::MAX {
                        *left -= 1;
                    }
                    return Err(ExtractionError::Analyzer(format!("cannot extract {id}")));
                }
            }
        }

        let structured = self.engine.process(event).await?;
        self.extracted.lock().push(structured.clone());
        Ok(structured)
    }
}
