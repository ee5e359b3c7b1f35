//! Bounded work queue drained by a resizable set of persistent worker tasks.
//!
//! A `TaskPool` owns up to [`MAX_WORKERS`] periodic [`Task`]s. Each worker
//! tick takes one [`WorkItem`] from the pool's queue and runs it. Two delivery
//! policies are fixed at construction:
//!
//! - **Queue mode**: at-most-once FIFO. Every submission posts a semaphore
//!   permit; idle workers block on the semaphore (bounded) rather than spin.
//!   Submitting to a full queue fails with `NoSpace` instead of blocking.
//! - **Cycling mode**: items stay resident and workers re-read them
//!   round-robin forever. Removal and clear shrink the resident set.
//!
//! # Example
//!
//! ```
//! use prometheus_taskpool::config::TaskPoolConfig;
//! use prometheus_taskpool::core::TaskPool;
//! use prometheus_taskpool::Timeout;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let pool = TaskPool::new(
//!     TaskPoolConfig::new()
//!         .with_worker_count(2)
//!         .with_max_task_count(16),
//! )
//! .unwrap();
//!
//! let done = Arc::new(AtomicUsize::new(0));
//! for _ in 0..4 {
//!     let done = Arc::clone(&done);
//!     pool.add_work(move |n: &usize| { done.fetch_add(*n, Ordering::SeqCst); }, 1)
//!         .unwrap();
//! }
//!
//! while done.load(Ordering::SeqCst) < 4 {
//!     std::thread::sleep(Duration::from_millis(5));
//! }
//! pool.delete(Timeout::Infinite).unwrap();
//! ```

mod slot_list;
mod work_item;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::TaskPoolConfig;
use crate::core::error::{RecordErrno, TaskError, TaskResult};
use crate::core::task::{Period, Task, TaskConfig};
use crate::util::Timeout;
use crate::Semaphore;

use slot_list::SlotList;
pub use work_item::{WorkFn, WorkItem};

/// Upper bound on the number of workers in one pool.
pub const MAX_WORKERS: usize = 32;

/// How long construction and growth wait for a new worker to confirm start.
const START_CONFIRM_TIMEOUT: Duration = Duration::from_secs(5);

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker tasks.
    pub worker_count: usize,
    /// Items resident in the queue.
    pub queued_items: usize,
    /// Semaphore value (queue mode: items not yet taken by a worker).
    pub pending: usize,
    /// Items accepted by `add_work`.
    pub submitted: u64,
    /// Item executions that returned normally.
    pub completed: u64,
    /// Item executions that panicked.
    pub failed: u64,
    /// Submissions refused because the queue was full.
    pub rejected: u64,
    /// Items removed by `remove_if` or `clear`.
    pub removed: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
struct PoolCounters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    removed: AtomicU64,
}

/// State workers share with the pool handle.
///
/// Workers hold their own `Arc`, so a worker abandoned after a stop timeout
/// can still finish its tick safely.
struct PoolShared<P> {
    queue: Mutex<SlotList<WorkItem<P>>>,
    pending: Semaphore,
    cycling: bool,
    worker_wait: Duration,
    counters: PoolCounters,
}

impl<P> PoolShared<P> {
    /// One worker tick: take at most one item and run it outside the lock.
    fn tick(&self, worker_id: usize) {
        if !self.cycling && self.pending.wait(Timeout::After(self.worker_wait)).is_err() {
            return;
        }

        let item = {
            let mut queue = self.queue.lock();
            if self.cycling {
                queue.cycling_next().cloned()
            } else {
                queue.pop_back()
            }
        };
        let Some(item) = item else {
            return;
        };

        if panic::catch_unwind(AssertUnwindSafe(|| item.run())).is_ok() {
            self.counters.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!(worker_id = worker_id, "Work item panicked");
        }
    }

    /// Keep the semaphore in step with an item removed by the caller.
    fn forget_pending(&self, removed: usize) {
        if self.cycling {
            return;
        }
        for _ in 0..removed {
            // a worker may already hold the permit for this item
            if self.pending.try_wait().is_err() {
                break;
            }
        }
    }
}

/// A pool worker: one periodic task running the worker tick.
#[derive(Debug)]
struct Worker {
    id: usize,
    task: Task,
}

/// Capacity-bounded work queue served by a resizable set of worker tasks.
pub struct TaskPool<P>
where
    P: Send + Sync + 'static,
{
    /// Pool configuration.
    config: TaskPoolConfig,

    /// Queue and counters shared with the workers.
    shared: Arc<PoolShared<P>>,

    /// Workers, guarded separately from the queue.
    workers: Mutex<SlotList<Worker>>,

    /// Id handed to the next spawned worker.
    next_worker_id: AtomicUsize,

    /// Last [`TaskPool::all_pause`] state, applied to workers spawned later.
    paused: AtomicBool,
}

impl<P> std::fmt::Debug for TaskPool<P>
where
    P: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPool")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<P> TaskPool<P>
where
    P: Send + Sync + 'static,
{
    /// Create a pool and start `config.worker_count` workers.
    ///
    /// Returns once every worker has confirmed it is running.
    ///
    /// # Errors
    ///
    /// - `TaskError::InvalidArgument` if the configuration is invalid
    /// - `TaskError::Spawn` if a worker thread cannot be created; workers
    ///   already started are stopped again
    pub fn new(config: TaskPoolConfig) -> TaskResult<Self> {
        config
            .validate()
            .map_err(TaskError::InvalidArgument)
            .record()?;

        let shared = Arc::new(PoolShared {
            queue: Mutex::new(SlotList::new(config.max_task_count)?),
            pending: Semaphore::new(0),
            cycling: config.cycling,
            worker_wait: Duration::from_millis(config.worker_wait_ms),
            counters: PoolCounters::default(),
        });

        let pool = Self {
            workers: Mutex::new(SlotList::new(MAX_WORKERS)?),
            shared,
            next_worker_id: AtomicUsize::new(0),
            paused: AtomicBool::new(false),
            config,
        };

        if let Err(err) = pool.reset_worker_count(pool.config.worker_count) {
            warn!(error = %err, "TaskPool construction failed - tearing down workers");
            let _ = pool.stop_workers(Timeout::After(pool.worker_stop_timeout()));
            return Err(err).record();
        }

        info!(
            worker_count = pool.config.worker_count,
            max_task_count = pool.config.max_task_count,
            cycling = pool.config.cycling,
            "TaskPool initialized"
        );
        Ok(pool)
    }

    /// Pool configuration.
    #[must_use]
    pub const fn config(&self) -> &TaskPoolConfig {
        &self.config
    }

    /// Whether the pool re-delivers resident items round-robin.
    #[must_use]
    pub fn is_cycling(&self) -> bool {
        self.shared.cycling
    }

    /// Maximum number of resident items.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.queue.lock().capacity()
    }

    /// Items currently resident in the queue.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// `true` if no item is resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Semaphore value; in queue mode the number of items no worker has taken yet.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.pending.value()
    }

    /// Submit `proc(&params)`.
    ///
    /// Never blocks on a full queue.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::NoSpace` if `max_task_count` items are resident.
    pub fn add_work<F>(&self, proc: F, params: P) -> TaskResult<()>
    where
        F: Fn(&P) + Send + Sync + 'static,
    {
        self.submit(WorkItem::new(proc, params))
    }

    /// Submit `proc(&params)` followed by `callback(&params)`.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::NoSpace` if `max_task_count` items are resident.
    pub fn add_work_with_callback<F, C>(&self, proc: F, params: P, callback: C) -> TaskResult<()>
    where
        F: Fn(&P) + Send + Sync + 'static,
        C: Fn(&P) + Send + Sync + 'static,
    {
        self.submit(WorkItem::new(proc, params).with_callback(callback))
    }

    /// Submit a prepared [`WorkItem`].
    ///
    /// # Errors
    ///
    /// Returns `TaskError::NoSpace` if `max_task_count` items are resident.
    pub fn submit(&self, item: WorkItem<P>) -> TaskResult<()> {
        let mut queue = self.shared.queue.lock();
        if let Err(err) = queue.push_front(item) {
            drop(queue);
            self.shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
            warn!("TaskPool queue is full");
            return Err(err).record();
        }
        // posted under the queue lock so the count never runs ahead of the queue
        if !self.shared.cycling {
            self.shared.pending.post(1)?;
        }
        drop(queue);

        self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        debug!("Work item submitted to task pool");
        Ok(())
    }

    /// Remove the first resident item (newest first) matching `pred`.
    pub fn remove_if<F>(&self, pred: F) -> Option<WorkItem<P>>
    where
        F: FnMut(&WorkItem<P>) -> bool,
    {
        let mut queue = self.shared.queue.lock();
        let removed = queue.pop_if(pred)?;
        self.shared.forget_pending(1);
        drop(queue);

        self.shared.counters.removed.fetch_add(1, Ordering::Relaxed);
        Some(removed)
    }

    /// Remove every resident item, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut queue = self.shared.queue.lock();
        let drained = queue.drain().len();
        self.shared.forget_pending(drained);
        drop(queue);

        self.shared
            .counters
            .removed
            .fetch_add(drained as u64, Ordering::Relaxed);
        debug!(drained = drained, "Task pool queue cleared");
        drained
    }

    /// Number of workers.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Grow or shrink the pool to `count` workers.
    ///
    /// Shrinking stops workers from the back with the configured grace
    /// timeout; a worker that does not stop in time is abandoned and exits on
    /// its own. Growing spawns workers and waits for each to confirm start.
    ///
    /// # Errors
    ///
    /// - `TaskError::InvalidArgument` if `count > MAX_WORKERS`
    /// - `TaskError::Spawn` / `TaskError::TimedOut` if a new worker fails to start
    /// - `TaskError::WorkerCountMismatch` if the pool ends up at a different size
    pub fn reset_worker_count(&self, count: usize) -> TaskResult<()> {
        if count > MAX_WORKERS {
            return Err(TaskError::InvalidArgument(format!(
                "worker count {count} exceeds maximum {MAX_WORKERS}"
            )))
            .record();
        }

        let mut workers = self.workers.lock();
        let before = workers.len();

        if workers.len() > count {
            let mut retired = Vec::with_capacity(workers.len() - count);
            while workers.len() > count {
                let Some(worker) = workers.pop_back() else {
                    break;
                };
                // raise every stop first so the grace periods overlap
                worker.task.request_stop();
                retired.push(worker);
            }
            let timeout = Timeout::After(self.worker_stop_timeout());
            for worker in retired {
                // an abandoned worker still leaves the roster
                let _ = retire(worker, timeout);
            }
        }

        while workers.len() < count {
            let worker = self.spawn_worker()?;
            workers.push_back(worker)?;
        }

        let actual = workers.len();
        drop(workers);

        if actual != count {
            return Err(TaskError::WorkerCountMismatch {
                requested: count,
                actual,
            })
            .record();
        }
        if actual != before {
            info!(from = before, to = actual, "TaskPool resized");
        }
        Ok(())
    }

    /// Pause (`true`) or resume (`false`) every worker.
    ///
    /// The state sticks to the pool: workers added by a later
    /// [`TaskPool::reset_worker_count`] start paused until `all_pause(false)`.
    pub fn all_pause(&self, paused: bool) {
        let workers = self.workers.lock();
        self.paused.store(paused, Ordering::Release);
        for worker in workers.iter() {
            worker.task.pause(paused);
        }
        debug!(paused = paused, worker_count = workers.len(), "TaskPool pause toggled");
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let counters = &self.shared.counters;
        PoolStats {
            worker_count: self.worker_count(),
            queued_items: self.len(),
            pending: self.pending(),
            submitted: counters.submitted.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            rejected: counters.rejected.load(Ordering::Relaxed),
            removed: counters.removed.load(Ordering::Relaxed),
        }
    }

    /// Stop every worker, then drop every queued item.
    ///
    /// Workers are stopped with `timeout` each ([`Timeout::Infinite`] is
    /// capped like [`Task::stop`]). The queue is reclaimed only after all
    /// workers are gone.
    ///
    /// # Errors
    ///
    /// Returns the first worker stop failure; cleanup continues regardless.
    pub fn delete(self, timeout: Timeout) -> TaskResult<()> {
        let worker_count = self.worker_count();
        let result = self.stop_workers(timeout);
        let drained = self.clear();
        info!(
            worker_count = worker_count,
            drained = drained,
            "TaskPool deleted"
        );
        result
    }

    fn stop_workers(&self, timeout: Timeout) -> TaskResult<()> {
        let retired = self.workers.lock().drain();
        for worker in &retired {
            worker.task.request_stop();
        }
        let mut first_err = None;
        for worker in retired {
            if let Err(err) = retire(worker, timeout) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), |err| Err(err).record())
    }

    fn spawn_worker(&self) -> TaskResult<Worker> {
        let id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        let mut task_config = TaskConfig::new()
            .with_period(Period::every_millis(self.config.worker_period_ms))
            .with_suspended(true)
            .with_name(format!("tp-worker-{id}"));
        if let Some(stack_size) = self.config.stack_size {
            task_config = task_config.with_stack_size(stack_size);
        }

        let shared = Arc::clone(&self.shared);
        let task = Task::spawn(task_config, move |_ctx| shared.tick(id))?;
        // callers hold the workers lock, so this cannot race all_pause
        if self.paused.load(Ordering::Acquire) {
            task.pause(true);
        }
        task.start(Duration::ZERO);
        task.wait_start(Timeout::After(START_CONFIRM_TIMEOUT))?;

        debug!(worker_id = id, "Worker started");
        Ok(Worker { id, task })
    }

    const fn worker_stop_timeout(&self) -> Duration {
        Duration::from_millis(self.config.worker_stop_timeout_ms)
    }
}

/// Stop one worker, logging the outcome.
fn retire(worker: Worker, timeout: Timeout) -> TaskResult<()> {
    let id = worker.id;
    match worker.task.stop(timeout) {
        Ok(()) => {
            debug!(worker_id = id, "Worker stopped");
            Ok(())
        }
        Err(err) => {
            warn!(worker_id = id, error = %err, "Worker did not stop cleanly");
            Err(err)
        }
    }
}
