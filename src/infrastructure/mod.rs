//! Storage adapters for the snapshot and audit ports.

pub mod file;
pub mod in_memory;
