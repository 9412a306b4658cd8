//! # Kiddo App
//!
//! Binary layer: wires configuration, adapters and the orchestrator together.
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Chooses concrete adapters once, at startup

pub mod context;

pub use context::AppContext;
