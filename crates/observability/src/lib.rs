//! Tracing/logging setup shared by binaries built on crudkit.

/// Initialize process-wide logging with [`ObservabilityConfig::default`].
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init_with(&ObservabilityConfig::default());
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use self::tracing::{ObservabilityConfig, init_with};
