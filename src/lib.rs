//! # Prometheus Taskpool
//!
//! Controllable OS-thread tasks and a bounded, resizable task pool built on
//! a small set of blocking primitives.
//!
//! ## Building blocks
//!
//! - [`Event`]: auto- or manual-reset flag threads can block on
//! - [`Semaphore`]: bounded counting semaphore
//! - [`Mutex`] / [`Condvar`]: `parking_lot` locks with a deadline-based wait
//! - [`core::Mempool`]: fixed-capacity block pool addressed by generation-checked ids
//! - [`core::List`]: ordered collection with a round-robin cursor
//!
//! Every blocking call takes a [`Timeout`]: a poll, a bounded wait, or an
//! infinite wait.
//!
//! ## Task
//!
//! A [`core::Task`] wraps one OS thread running a body once or periodically,
//! with start, stop, pause and period control:
//!
//! ```rust,no_run
//! use prometheus_taskpool::core::{Period, Task, TaskConfig};
//! use prometheus_taskpool::Timeout;
//! use std::time::Duration;
//!
//! let task = Task::spawn(
//!     TaskConfig::new()
//!         .with_period(Period::every_millis(100))
//!         .with_suspended(true),
//!     |ctx| println!("iteration {}", ctx.iteration()),
//! )?;
//! task.start(Duration::ZERO);
//! task.pause(true);
//! task.pause(false);
//! task.stop(Timeout::After(Duration::from_secs(1)))?;
//! # Ok::<(), prometheus_taskpool::core::TaskError>(())
//! ```
//!
//! ## TaskPool
//!
//! A [`core::TaskPool`] is a capacity-bounded queue of work items drained by
//! up to [`core::MAX_WORKERS`] worker tasks. In queue mode each item runs
//! once in FIFO order; in cycling mode resident items are re-run round-robin.
//!
//! ```rust,no_run
//! use prometheus_taskpool::config::TaskPoolConfig;
//! use prometheus_taskpool::core::TaskPool;
//! use prometheus_taskpool::Timeout;
//!
//! let pool = TaskPool::new(TaskPoolConfig::new().with_worker_count(4))?;
//! pool.add_work(|job: &String| println!("{job}"), "hello".to_string())?;
//! pool.reset_worker_count(8)?;
//! pool.delete(Timeout::Infinite)?;
//! # Ok::<(), prometheus_taskpool::core::TaskError>(())
//! ```
//!
//! Pools can also be described in JSON or `TASKPOOL_*` environment variables,
//! see [`config`] and [`builders`].

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod condvar;
mod event;
mod mutex;
mod semaphore;

/// Tasks, task pools, error types and containers.
pub mod core;
/// Configuration models for task pools.
pub mod config;
/// Builders to construct task pools from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;

pub use condvar::Condvar;
pub use event::{Event, EventMode};
pub use mutex::{Mutex, MutexGuard};
pub use semaphore::Semaphore;
pub use util::Timeout;
