//! Telemetry helpers for structured logging.
//!
//! The crate only emits `tracing` events; installing a subscriber is left to
//! the application. These helpers cover the common case.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "prometheus_taskpool=info";

/// Install an env-filtered `fmt` subscriber unless one is already set.
///
/// Reads `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
pub fn init_tracing() {
    init_tracing_with_default(DEFAULT_FILTER);
}

/// Like [`init_tracing`] with a caller-chosen fallback filter.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing_with_default(default_filter: &str) -> bool {
    if tracing::dispatcher::has_been_set() {
        return false;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        init_tracing();
        assert!(!init_tracing_with_default("debug"));
    }
}
