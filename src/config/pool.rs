//! Task pool and engine configuration structures.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::MAX_WORKERS;

/// Smallest stack a worker thread may be configured with.
pub const MIN_STACK_SIZE: usize = 16 * 1024;

/// Configuration for one [`TaskPool`](crate::core::TaskPool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskPoolConfig {
    /// Workers started at construction.
    pub worker_count: usize,
    /// Maximum number of resident work items.
    pub max_task_count: usize,
    /// Worker thread stack size in bytes; platform default when `None`.
    pub stack_size: Option<usize>,
    /// Re-deliver resident items round-robin instead of consuming them.
    pub cycling: bool,
    /// Period of the worker tick in milliseconds.
    pub worker_period_ms: u64,
    /// How long an idle queue-mode worker waits for an item per tick.
    pub worker_wait_ms: u64,
    /// Grace period when stopping a worker during resize or delete.
    pub worker_stop_timeout_ms: u64,
}

impl Default for TaskPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get().clamp(1, MAX_WORKERS),
            max_task_count: 1024,
            stack_size: None,
            cycling: false,
            worker_period_ms: 1,
            worker_wait_ms: 100,
            worker_stop_timeout_ms: 2_000,
        }
    }
}

impl TaskPoolConfig {
    /// Defaults: one worker per CPU (at most [`MAX_WORKERS`]), 1024 items,
    /// queue mode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial worker count.
    #[must_use]
    pub const fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the queue capacity.
    #[must_use]
    pub const fn with_max_task_count(mut self, max_task_count: usize) -> Self {
        self.max_task_count = max_task_count;
        self
    }

    /// Set the worker stack size.
    #[must_use]
    pub const fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// Select cycling (`true`) or queue (`false`) delivery.
    #[must_use]
    pub const fn with_cycling(mut self, cycling: bool) -> Self {
        self.cycling = cycling;
        self
    }

    /// Set the worker tick period.
    #[must_use]
    pub const fn with_worker_period_ms(mut self, ms: u64) -> Self {
        self.worker_period_ms = ms;
        self
    }

    /// Set the idle wait per queue-mode tick.
    #[must_use]
    pub const fn with_worker_wait_ms(mut self, ms: u64) -> Self {
        self.worker_wait_ms = ms;
        self
    }

    /// Set the worker stop grace period.
    #[must_use]
    pub const fn with_worker_stop_timeout_ms(mut self, ms: u64) -> Self {
        self.worker_stop_timeout_ms = ms;
        self
    }

    /// Validate pool configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count > MAX_WORKERS {
            return Err(format!(
                "worker_count must be at most {MAX_WORKERS}, got {}",
                self.worker_count
            ));
        }
        if self.max_task_count == 0 {
            return Err("max_task_count must be greater than 0".into());
        }
        if u32::try_from(self.max_task_count).is_err() {
            return Err("max_task_count does not fit in 32 bits".into());
        }
        if self.worker_period_ms == 0 {
            return Err("worker_period_ms must be greater than 0".into());
        }
        if self.worker_wait_ms == 0 {
            return Err("worker_wait_ms must be greater than 0".into());
        }
        if self.worker_stop_timeout_ms == 0 {
            return Err("worker_stop_timeout_ms must be greater than 0".into());
        }
        if let Some(stack_size) = self.stack_size {
            if stack_size < MIN_STACK_SIZE {
                return Err(format!(
                    "stack_size must be at least {MIN_STACK_SIZE} bytes, got {stack_size}"
                ));
            }
        }
        Ok(())
    }

    /// Build from `TASKPOOL_*` environment variables, loading `.env` first.
    ///
    /// Recognised: `TASKPOOL_WORKER_COUNT`, `TASKPOOL_MAX_TASK_COUNT`,
    /// `TASKPOOL_STACK_SIZE`, `TASKPOOL_CYCLING`, `TASKPOOL_WORKER_PERIOD_MS`,
    /// `TASKPOOL_WORKER_WAIT_MS`, `TASKPOOL_WORKER_STOP_TIMEOUT_MS`. Unset
    /// variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a description if a variable fails to parse or the result is invalid.
    pub fn from_env() -> Result<Self, String> {
        // a missing .env file is not an error
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();
        if let Some(v) = env_var("TASKPOOL_WORKER_COUNT")? {
            cfg.worker_count = v;
        }
        if let Some(v) = env_var("TASKPOOL_MAX_TASK_COUNT")? {
            cfg.max_task_count = v;
        }
        if let Some(v) = env_var("TASKPOOL_STACK_SIZE")? {
            cfg.stack_size = Some(v);
        }
        if let Some(v) = env_var("TASKPOOL_CYCLING")? {
            cfg.cycling = v;
        }
        if let Some(v) = env_var("TASKPOOL_WORKER_PERIOD_MS")? {
            cfg.worker_period_ms = v;
        }
        if let Some(v) = env_var("TASKPOOL_WORKER_WAIT_MS")? {
            cfg.worker_wait_ms = v;
        }
        if let Some(v) = env_var("TASKPOOL_WORKER_STOP_TIMEOUT_MS")? {
            cfg.worker_stop_timeout_ms = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn env_var<T>(key: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("{key}: {e}")),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(format!("{key}: {e}")),
    }
}

/// Root configuration: a set of named pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Map of pool name to configuration.
    pub pools: HashMap<String, TaskPoolConfig>,
}

impl EngineConfig {
    /// Validate all pools and ensure at least one pool exists.
    ///
    /// # Errors
    ///
    /// Returns a description naming the first invalid pool.
    pub fn validate(&self) -> Result<(), String> {
        if self.pools.is_empty() {
            return Err("at least one pool must be defined".into());
        }
        for (name, pool) in &self.pools {
            pool.validate()
                .map_err(|e| format!("pool `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse engine configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description on parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
