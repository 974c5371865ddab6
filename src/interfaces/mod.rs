//! Client-facing surfaces: session channels and the batch request file.

pub mod csv;
pub mod session;
