//! Tests for configuration loading, validation and the pool builders

use prometheus_taskpool::builders::{build_pools, PoolBuilder};
use prometheus_taskpool::config::{EngineConfig, TaskPoolConfig, MIN_STACK_SIZE};
use prometheus_taskpool::core::MAX_WORKERS;
use prometheus_taskpool::Timeout;

const ENGINE_JSON: &str = r#"{
    "pools": {
        "io": { "worker_count": 2, "max_task_count": 64 },
        "tick": { "worker_count": 1, "max_task_count": 8, "cycling": true }
    }
}"#;

#[test]
fn test_task_pool_config_validation() {
    assert!(TaskPoolConfig::new().validate().is_ok());
    assert!(TaskPoolConfig::new()
        .with_worker_count(MAX_WORKERS)
        .validate()
        .is_ok());
    assert!(TaskPoolConfig::new()
        .with_worker_count(MAX_WORKERS + 1)
        .validate()
        .is_err());
    assert!(TaskPoolConfig::new()
        .with_stack_size(MIN_STACK_SIZE - 1)
        .validate()
        .is_err());
    assert!(TaskPoolConfig::new()
        .with_worker_stop_timeout_ms(0)
        .validate()
        .is_err());
}

#[test]
fn test_engine_config_from_json() {
    let cfg = EngineConfig::from_json_str(ENGINE_JSON).unwrap();
    assert_eq!(cfg.pools.len(), 2);
    assert_eq!(cfg.pools["io"].max_task_count, 64);
    assert!(cfg.pools["tick"].cycling);
    assert!(!cfg.pools["io"].cycling);
}

#[test]
fn test_engine_config_rejects_malformed_json() {
    let err = EngineConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_from_env_reads_taskpool_vars() {
    std::env::set_var("TASKPOOL_WORKER_COUNT", "3");
    std::env::set_var("TASKPOOL_MAX_TASK_COUNT", "40");
    std::env::set_var("TASKPOOL_CYCLING", "true");
    let cfg = TaskPoolConfig::from_env().unwrap();
    assert_eq!(cfg.worker_count, 3);
    assert_eq!(cfg.max_task_count, 40);
    assert!(cfg.cycling);

    std::env::set_var("TASKPOOL_WORKER_COUNT", "many");
    let err = TaskPoolConfig::from_env().unwrap_err();
    assert!(err.contains("TASKPOOL_WORKER_COUNT"));

    std::env::remove_var("TASKPOOL_WORKER_COUNT");
    std::env::remove_var("TASKPOOL_MAX_TASK_COUNT");
    std::env::remove_var("TASKPOOL_CYCLING");
}

#[test]
fn test_pool_builder_defaults() {
    let builder = PoolBuilder::new("pool1", TaskPoolConfig::new().with_max_task_count(16))
        .worker_count(1);
    assert_eq!(builder.name(), "pool1");
    assert_eq!(builder.config().worker_count, 1);
    assert_eq!(builder.config().max_task_count, 16);

    let pool = builder.build::<u32>().unwrap();
    assert_eq!(pool.worker_count(), 1);
    assert_eq!(pool.capacity(), 16);
    pool.delete(Timeout::Infinite).unwrap();
}

#[test]
fn test_pool_builder_error_names_pool() {
    let err = PoolBuilder::new("broken", TaskPoolConfig::new())
        .max_task_count(0)
        .build::<()>()
        .unwrap_err();
    assert!(format!("{err:#}").contains("broken"));
}

#[test]
fn test_build_pools_from_engine_config() {
    let cfg = EngineConfig::from_json_str(ENGINE_JSON).unwrap();
    let pools = build_pools::<String>(&cfg).unwrap();

    assert_eq!(pools.len(), 2);
    assert_eq!(pools["io"].worker_count(), 2);
    assert_eq!(pools["io"].capacity(), 64);
    assert!(pools["tick"].is_cycling());

    for (_, pool) in pools {
        pool.delete(Timeout::Infinite).unwrap();
    }
}
