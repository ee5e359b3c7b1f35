//! Builders to construct task pools from configuration.

use std::collections::HashMap;

use anyhow::{anyhow, Context};
use tracing::info;

use crate::config::{EngineConfig, TaskPoolConfig};
use crate::core::{AppResult, TaskPool};

/// Named pool under construction.
#[derive(Debug, Clone)]
pub struct PoolBuilder {
    name: String,
    config: TaskPoolConfig,
}

impl PoolBuilder {
    /// Builder for the pool `name` with `config`.
    pub fn new(name: impl Into<String>, config: TaskPoolConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Pool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pool configuration.
    #[must_use]
    pub const fn config(&self) -> &TaskPoolConfig {
        &self.config
    }

    /// Override the worker count.
    #[must_use]
    pub const fn worker_count(mut self, worker_count: usize) -> Self {
        self.config.worker_count = worker_count;
        self
    }

    /// Override the queue capacity.
    #[must_use]
    pub const fn max_task_count(mut self, max_task_count: usize) -> Self {
        self.config.max_task_count = max_task_count;
        self
    }

    /// Start the pool.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or a worker cannot be started;
    /// the error names the pool.
    pub fn build<P>(self) -> AppResult<TaskPool<P>>
    where
        P: Send + Sync + 'static,
    {
        let pool = TaskPool::new(self.config)
            .with_context(|| format!("failed to start pool `{}`", self.name))?;
        info!(pool = %self.name, "Pool built");
        Ok(pool)
    }
}

/// Build every pool named in `cfg`.
///
/// If a later pool fails, the workers of pools already started are signalled
/// to stop as those pools are dropped.
///
/// # Errors
///
/// Fails on an invalid configuration or the first pool that cannot start.
pub fn build_pools<P>(cfg: &EngineConfig) -> AppResult<HashMap<String, TaskPool<P>>>
where
    P: Send + Sync + 'static,
{
    cfg.validate().map_err(|e| anyhow!("config invalid: {e}"))?;

    let mut pools = HashMap::with_capacity(cfg.pools.len());
    for (name, pool_cfg) in &cfg.pools {
        let pool = PoolBuilder::new(name.clone(), pool_cfg.clone()).build()?;
        pools.insert(name.clone(), pool);
    }
    Ok(pools)
}
