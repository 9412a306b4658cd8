//! Source connectors and their factory

mod mailbox;
mod memory;

use std::sync::Arc;

use kiddo_core::SourceConnector;
use kiddo_domain::ConnectorConfig;

pub use mailbox::{MailMessage, MailboxConnector};
pub use memory::MemoryConnector;

/// Create one connector per config entry, in config order
pub fn build_connectors(configs: &[ConnectorConfig]) -> Vec<Arc<dyn SourceConnector>> {
    configs
        .iter()
        .map(|config| -> Arc<dyn SourceConnector> {
            match config {
                ConnectorConfig::Memory(memory) => Arc::new(MemoryConnector::from_config(memory)),
                ConnectorConfig::Mailbox(mailbox) => Arc::new(MailboxConnector::new(mailbox.clone())),
            }
        })
        .collect()
}
