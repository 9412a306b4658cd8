//! Source connector ports

pub mod ports;

pub use ports::{EventStream, SourceConnector};
