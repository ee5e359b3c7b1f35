//! Controllable OS thread with start/stop/pause and periodic re-execution.
//!
//! A [`Task`] spawns its thread immediately, blocked on a `start` gate. Once
//! started, the thread runs its body once ([`Period::Once`]) or repeatedly at
//! a fixed period ([`Period::Every`]). The loop is driven by four events the
//! task owns exclusively:
//!
//! | event    | mode   | meaning                                         |
//! |----------|--------|-------------------------------------------------|
//! | `start`  | manual | gates the first iteration                       |
//! | `stop`   | manual | termination requested; doubles as a stop token  |
//! | `finish` | auto   | last iteration (or the whole thread) is done    |
//! | `pause`  | manual | cleared = block before the next iteration       |
//!
//! A fifth manual event, `exited`, is set once the thread has left its loop
//! and run its callback. The thread sets `finish` and `exited` on exit even
//! when the body panics, so a bounded [`Task::stop`] never waits forever once
//! stop was requested.
//!
//! ```
//! use prometheus_taskpool::core::{Period, Task, TaskConfig};
//! use prometheus_taskpool::Timeout;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let ticks = Arc::new(AtomicU32::new(0));
//! let counter = Arc::clone(&ticks);
//! let task = Task::spawn(
//!     TaskConfig::new().with_period(Period::every_millis(5)),
//!     move |_ctx| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     },
//! )
//! .unwrap();
//!
//! std::thread::sleep(Duration::from_millis(50));
//! task.stop(Timeout::Infinite).unwrap();
//! assert!(ticks.load(Ordering::SeqCst) > 0);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::core::error::{RecordErrno, TaskError, TaskResult};
use crate::util::scope_guard::ScopeGuard;
use crate::util::Timeout;
use crate::Event;

/// Ceiling applied to [`Timeout::Infinite`] in [`Task::stop`].
pub const STOP_TIMEOUT_CAP: Duration = Duration::from_secs(60);

/// Shortest sleep between two iterations when the body overran its period.
const MIN_SLEEP: Duration = Duration::from_millis(1);

/// Raw encoding of [`Period::Once`] in the atomic period cell.
const ONE_SHOT: u64 = u64::MAX;

/// How often a task runs its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    /// Run the body once, then exit and release the task.
    Once,
    /// Re-run the body every interval until stopped.
    Every(Duration),
}

impl Period {
    /// Periodic schedule from milliseconds.
    #[must_use]
    pub const fn every_millis(ms: u64) -> Self {
        Self::Every(Duration::from_millis(ms))
    }

    /// `true` for [`Period::Once`].
    #[must_use]
    pub const fn is_once(self) -> bool {
        matches!(self, Self::Once)
    }

    fn to_raw(self) -> u64 {
        match self {
            Self::Once => ONE_SHOT,
            // clamp so a huge period never collides with the sentinel
            Self::Every(d) => {
                u64::try_from(d.as_millis()).map_or(ONE_SHOT - 1, |ms| ms.min(ONE_SHOT - 1))
            }
        }
    }

    const fn from_raw(raw: u64) -> Self {
        if raw == ONE_SHOT {
            Self::Once
        } else {
            Self::Every(Duration::from_millis(raw))
        }
    }
}

/// Options for [`Task::spawn`].
#[derive(Debug, Clone)]
pub struct TaskConfig {
    name: Option<String>,
    period: Period,
    suspended: bool,
    stack_size: Option<usize>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskConfig {
    /// One-shot, not suspended, default thread name and stack size.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            name: None,
            period: Period::Once,
            suspended: false,
            stack_size: None,
        }
    }

    /// Set the run period.
    #[must_use]
    pub const fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    /// Create the task with its `start` gate closed; nothing runs until
    /// [`Task::start`].
    #[must_use]
    pub const fn with_suspended(mut self, suspended: bool) -> Self {
        self.suspended = suspended;
        self
    }

    /// Thread stack size in bytes.
    #[must_use]
    pub const fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// Thread name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// State shared between a [`Task`] handle and its thread.
#[derive(Debug)]
struct TaskShared {
    id: Uuid,
    name: String,
    start: Event,
    stop: Event,
    finish: Event,
    pause: Event,
    exited: Event,
    period: AtomicU64,
    iterations: AtomicU64,
}

impl TaskShared {
    /// Raise `stop` and open every gate the thread could be parked on.
    fn request_stop(&self) {
        self.stop.set();
        if !self.start.is_set() {
            self.start.set();
        }
        if !self.pause.is_set() {
            self.pause.set();
        }
    }
}

/// Handle the body receives on every iteration.
///
/// Gives the running body access to its own task without any thread-local
/// lookup.
#[derive(Debug)]
pub struct TaskContext<'a> {
    shared: &'a TaskShared,
    iteration: u64,
    started: Instant,
}

impl TaskContext<'_> {
    /// Id of the running task.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Name of the running task.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Zero-based index of the current iteration.
    #[must_use]
    pub const fn iteration(&self) -> u64 {
        self.iteration
    }

    /// When the current iteration began.
    #[must_use]
    pub const fn iteration_started(&self) -> Instant {
        self.started
    }

    /// The task's current period.
    #[must_use]
    pub fn period(&self) -> Period {
        Period::from_raw(self.shared.period.load(Ordering::Acquire))
    }

    /// Change the task's period; the sleep after this iteration already uses it.
    pub fn set_period(&self, period: Period) {
        self.shared.period.store(period.to_raw(), Ordering::Release);
    }

    /// Signal `finish` now instead of waiting for the end of the iteration.
    pub fn signal_finished(&self) {
        self.shared.finish.set();
    }

    /// Whether a stop was requested. Long bodies should check this and
    /// return early.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.shared.stop.is_set()
    }
}

type TaskBody = Box<dyn FnMut(&TaskContext<'_>) + Send + 'static>;
type TaskCallback = Box<dyn FnOnce() + Send + 'static>;

/// One controllable OS thread running a user body.
///
/// Dropping a periodic task without [`Task::stop`] requests stop and detaches
/// the thread. Dropping a started one-shot task lets it run to completion.
#[derive(Debug)]
pub struct Task {
    shared: Arc<TaskShared>,
    handle: Option<JoinHandle<()>>,
    one_shot: bool,
    stopped: bool,
}

impl Task {
    /// Spawn a task running `body`.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Spawn` if the OS thread cannot be created.
    pub fn spawn<F>(config: TaskConfig, body: F) -> TaskResult<Self>
    where
        F: FnMut(&TaskContext<'_>) + Send + 'static,
    {
        Self::spawn_inner(config, Box::new(body), None)
    }

    /// Spawn a task running `body`, then `callback` once when the thread is
    /// done (after the single run of a one-shot task, or after stop for a
    /// periodic one).
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Spawn` if the OS thread cannot be created.
    pub fn spawn_with_callback<F, C>(config: TaskConfig, body: F, callback: C) -> TaskResult<Self>
    where
        F: FnMut(&TaskContext<'_>) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        Self::spawn_inner(config, Box::new(body), Some(Box::new(callback)))
    }

    fn spawn_inner(
        config: TaskConfig,
        body: TaskBody,
        callback: Option<TaskCallback>,
    ) -> TaskResult<Self> {
        let id = Uuid::new_v4();
        let name = config
            .name
            .unwrap_or_else(|| format!("task-{}", &id.as_simple().to_string()[..8]));

        let shared = Arc::new(TaskShared {
            id,
            name: name.clone(),
            start: Event::manual(!config.suspended),
            stop: Event::manual(false),
            finish: Event::auto(false),
            pause: Event::manual(true),
            exited: Event::manual(false),
            period: AtomicU64::new(config.period.to_raw()),
            iterations: AtomicU64::new(0),
        });

        let mut builder = thread::Builder::new().name(name);
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let thread_shared = Arc::clone(&shared);
        let handle = builder
            .spawn(move || thread_main(&thread_shared, body, callback))
            .map_err(|e| {
                error!(task_id = %id, error = %e, "Failed to spawn task thread");
                TaskError::Spawn(e.to_string())
            })
            .record()?;

        let one_shot = config.period.is_once();
        debug!(
            task_id = %id,
            one_shot,
            suspended = config.suspended,
            "Task spawned"
        );

        Ok(Self {
            shared,
            // one-shot threads are detached and release themselves
            handle: if one_shot { None } else { Some(handle) },
            one_shot,
            stopped: false,
        })
    }

    /// Task id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Open the `start` gate after sleeping `delay`.
    pub fn start(&self, delay: Duration) {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        self.shared.start.set();
        debug!(task_id = %self.shared.id, "Task started");
    }

    /// Raise `stop` without waiting; [`Task::stop`] still has to be called
    /// to reclaim the thread.
    pub(crate) fn request_stop(&self) {
        self.shared.request_stop();
    }

    /// Whether the `start` gate is open.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.shared.start.is_set()
    }

    /// Pause (`true`) or resume (`false`) before the next iteration.
    ///
    /// No-op when the task is already in the requested state. An iteration
    /// already in flight is not interrupted.
    pub fn pause(&self, paused: bool) {
        let running = self.shared.pause.is_set();
        if paused && running {
            self.shared.pause.reset();
            debug!(task_id = %self.shared.id, "Task paused");
        } else if !paused && !running {
            self.shared.pause.set();
            debug!(task_id = %self.shared.id, "Task resumed");
        }
    }

    /// Whether the task is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        !self.shared.pause.is_set()
    }

    /// Current period.
    #[must_use]
    pub fn period(&self) -> Period {
        Period::from_raw(self.shared.period.load(Ordering::Acquire))
    }

    /// Change the period; picked up at the end of the current iteration.
    pub fn set_period(&self, period: Period) {
        self.shared.period.store(period.to_raw(), Ordering::Release);
    }

    /// Number of iterations begun so far.
    #[must_use]
    pub fn iterations(&self) -> u64 {
        self.shared.iterations.load(Ordering::Acquire)
    }

    /// Wait for the `start` gate to open.
    ///
    /// # Errors
    ///
    /// `TaskError::WouldBlock` or `TaskError::TimedOut` if it does not open in time.
    pub fn wait_start(&self, timeout: Timeout) -> TaskResult<()> {
        self.shared.start.wait(timeout)
    }

    /// Wait for the next `finish` signal, consuming it.
    ///
    /// # Errors
    ///
    /// `TaskError::WouldBlock` or `TaskError::TimedOut` if none arrives in time.
    pub fn wait_finish(&self, timeout: Timeout) -> TaskResult<()> {
        self.shared.finish.wait(timeout)
    }

    /// Stop the task and release it.
    ///
    /// Raises `stop` (opening the start and pause gates so a never-started or
    /// paused thread observes it) and waits for the thread to exit.
    /// [`Timeout::Infinite`] is capped at [`STOP_TIMEOUT_CAP`]. On success the
    /// thread has already left its loop, so the join returns at once. On
    /// timeout the thread is abandoned: it exits by itself at its next stop
    /// check and its shared state is released with it.
    ///
    /// A `finish` signal left over from an earlier iteration does not count.
    ///
    /// # Errors
    ///
    /// - `TaskError::WouldBlock` if `timeout` is a poll and the thread has not
    ///   exited yet, whether it is mid-iteration or sleeping between iterations
    /// - `TaskError::TimedOut` if the thread did not exit in time
    /// - `TaskError::Panicked` if the body panicked
    pub fn stop(mut self, timeout: Timeout) -> TaskResult<()> {
        self.stopped = true;
        self.shared.request_stop();

        if let Err(err) = self.shared.exited.wait(timeout.capped(STOP_TIMEOUT_CAP)) {
            warn!(
                task_id = %self.shared.id,
                error = %err,
                "Task did not exit within timeout - abandoning thread"
            );
            // dropping the handle detaches the thread
            drop(self.handle.take());
            return Err(err).record();
        }

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(task_id = %self.shared.id, "Task body panicked");
                return Err(TaskError::Panicked).record();
            }
        }
        debug!(task_id = %self.shared.id, "Task stopped");
        Ok(())
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }
        // a started one-shot task finishes on its own
        if !self.one_shot || !self.shared.start.is_set() {
            self.shared.request_stop();
            debug!(task_id = %self.shared.id, "Task dropped without stop - thread detached");
        }
    }
}

fn thread_main(shared: &TaskShared, mut body: TaskBody, callback: Option<TaskCallback>) {
    let _exit = ScopeGuard::new(|| {
        shared.finish.set();
        shared.exited.set();
    });

    run_loop(shared, &mut body);
    if let Some(callback) = callback {
        callback();
    }
    debug!(task_id = %shared.id, "Task thread exiting");
}

fn run_loop(shared: &TaskShared, body: &mut TaskBody) {
    // Infinite waits only return once the event is set.
    let _ = shared.start.wait(Timeout::Infinite);

    loop {
        if shared.stop.is_set() {
            break;
        }
        if !shared.pause.is_set() {
            let _ = shared.pause.wait(Timeout::Infinite);
            // stop opens the pause gate too
            if shared.stop.is_set() {
                break;
            }
        }

        let started = Instant::now();
        let iteration = shared.iterations.fetch_add(1, Ordering::AcqRel);
        shared.finish.reset();
        body(&TaskContext {
            shared,
            iteration,
            started,
        });
        shared.finish.set();

        let Period::Every(period) = Period::from_raw(shared.period.load(Ordering::Acquire)) else {
            break;
        };
        let nap = period
            .checked_sub(started.elapsed())
            .filter(|d| !d.is_zero())
            .unwrap_or(MIN_SLEEP);
        // the inter-iteration sleep wakes early on stop
        if shared.stop.wait(Timeout::After(nap)).is_ok() {
            break;
        }
    }
}
