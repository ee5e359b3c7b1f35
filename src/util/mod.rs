//! Shared utilities.

pub(crate) mod scope_guard;
pub mod telemetry;
pub mod timeout;

pub use telemetry::{init_tracing, init_tracing_with_default};
pub use timeout::Timeout;
