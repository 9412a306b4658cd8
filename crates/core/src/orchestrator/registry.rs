//! Orchestrator-owned lookup from source id to connector

use std::collections::HashMap;
use std::sync::Arc;

use super::error::{OrchestratorError, OrchestratorResult};
use crate::ingestion::SourceConnector;

/// Connectors keyed by `source_id`, in registration order
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: Vec<Arc<dyn SourceConnector>>,
    index: HashMap<String, usize>,
}

impl ConnectorRegistry {
    /// Build a registry, rejecting duplicate source ids
    pub fn new(
        connectors: impl IntoIterator<Item = Arc<dyn SourceConnector>>,
    ) -> OrchestratorResult<Self> {
        let mut registry = Self::default();
        for connector in connectors {
            registry.register(connector)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, connector: Arc<dyn SourceConnector>) -> OrchestratorResult<()> {
        let source_id = connector.source_id().to_string();
        if self.index.contains_key(&source_id) {
            return Err(OrchestratorError::DuplicateSource(source_id));
        }
        self.index.insert(source_id, self.connectors.len());
        self.connectors.push(connector);
        Ok(())
    }

    pub fn get(&self, source_id: &str) -> Option<&Arc<dyn SourceConnector>> {
        self.index.get(source_id).and_then(|&position| self.connectors.get(position))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SourceConnector>> {
        self.connectors.iter()
    }

    pub fn source_ids(&self) -> Vec<&str> {
        self.connectors.iter().map(|connector| connector.source_id()).collect()
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}
