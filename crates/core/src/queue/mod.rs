//! Event queue port

pub mod ports;

pub use ports::EventQueue;
