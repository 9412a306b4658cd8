//! Event queue adapters

mod memory;

pub use memory::InMemoryEventQueue;
