//! Error types for task and pool operations.
//!
//! Every fallible operation returns a [`TaskError`]. Failures are additionally
//! recorded in a thread-local errno-style slot so callers sitting behind a
//! C-like interface can read the last error code out of band.

use std::cell::Cell;

use thiserror::Error;

/// Errors produced by the task engine and its primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// An argument was out of range or referred to a stale resource.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A bounded resource (mempool, queue, semaphore) is exhausted.
    #[error("no space left")]
    NoSpace,
    /// A zero-timeout operation could not complete immediately.
    #[error("operation would block")]
    WouldBlock,
    /// A bounded wait expired.
    #[error("operation timed out")]
    TimedOut,
    /// The OS refused to spawn a thread.
    #[error("failed to spawn thread: {0}")]
    Spawn(String),
    /// The task body panicked; observed when the thread was joined.
    #[error("task body panicked")]
    Panicked,
    /// A resize finished with a different worker count than requested.
    #[error("worker count mismatch: requested {requested}, actual {actual}")]
    WorkerCountMismatch {
        /// Count that was requested.
        requested: usize,
        /// Count the pool ended up with.
        actual: usize,
    },
}

impl TaskError {
    /// errno-style code for this error.
    #[must_use]
    pub const fn errno(&self) -> i32 {
        match self {
            Self::InvalidArgument(_) | Self::WorkerCountMismatch { .. } => libc::EINVAL,
            Self::NoSpace => libc::ENOSPC,
            Self::WouldBlock | Self::Spawn(_) => libc::EAGAIN,
            Self::TimedOut => libc::ETIMEDOUT,
            Self::Panicked => libc::ECANCELED,
        }
    }
}

/// Result alias used throughout the engine.
pub type TaskResult<T> = Result<T, TaskError>;

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

thread_local! {
    static LAST_ERRNO: Cell<i32> = const { Cell::new(0) };
}

/// Last error code recorded on the calling thread, or 0.
#[must_use]
pub fn last_errno() -> i32 {
    LAST_ERRNO.with(Cell::get)
}

/// Reset the calling thread's error slot to 0.
pub fn clear_errno() {
    LAST_ERRNO.with(|e| e.set(0));
}

/// Records the error of a failed result in the thread-local errno slot.
pub(crate) trait RecordErrno {
    fn record(self) -> Self;
}

impl<T> RecordErrno for TaskResult<T> {
    fn record(self) -> Self {
        if let Err(err) = &self {
            LAST_ERRNO.with(|e| e.set(err.errno()));
        }
        self
    }
}
