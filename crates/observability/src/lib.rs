//! Tracing/logging setup shared by MedGate binaries.

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use self::tracing::{LogFormat, init};
