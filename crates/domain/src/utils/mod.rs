//! Pure string utilities shared by extraction and sinks

pub mod title;
