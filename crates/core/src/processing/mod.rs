//! Extraction pipeline: raw event to structured event

pub mod analyzer;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod normalizer;
pub mod ports;

pub use analyzer::HeuristicAnalyzer;
pub use engine::ProcessingEngine;
pub use error::{ExtractionError, ExtractionResult};
pub use extractor::{DataExtractor, ExtractedFields};
pub use normalizer::{EventNormalizer, NormalizedEvent};
pub use ports::{EventAnalyzer, ExtractionPipeline};
