//! Configuration models for task pools.

pub mod pool;

pub use pool::{EngineConfig, TaskPoolConfig, MIN_STACK_SIZE};
