//! Condition variable with [`Timeout`]-aware waits.
//!
//! Wraps `parking_lot::Condvar`. [`Condvar::wait_timeout_while`] is the one
//! blocking loop [`Event`](crate::Event) and [`Semaphore`](crate::Semaphore)
//! share: it maps a poll (or a zero `After`) to `WouldBlock` and an expired
//! deadline to `TimedOut`.

use std::time::Instant;

use crate::core::error::{TaskError, TaskResult};
use crate::util::Timeout;
use crate::MutexGuard;

/// A condition variable. Does not implement poisoning.
///
/// ```
/// use prometheus_taskpool::{Condvar, Mutex, Timeout};
/// use std::sync::Arc;
/// use std::thread;
/// use std::time::Duration;
///
/// let slot = Arc::new((Mutex::new(None::<u32>), Condvar::new()));
/// let producer = Arc::clone(&slot);
/// thread::spawn(move || {
///     let (lock, cvar) = &*producer;
///     *lock.lock() = Some(7);
///     cvar.notify_all();
/// });
///
/// let (lock, cvar) = &*slot;
/// let mut value = lock.lock();
/// cvar.wait_timeout_while(&mut value, Timeout::After(Duration::from_secs(5)), |v| v.is_none())
///     .unwrap();
/// assert_eq!(*value, Some(7));
/// ```
#[derive(Debug, Default)]
pub struct Condvar {
    inner: parking_lot::Condvar,
}

impl Condvar {
    /// New condition variable.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: parking_lot::Condvar::new(),
        }
    }

    /// Block until notified. Spurious wakeups are possible.
    #[inline]
    pub fn wait<T>(&self, guard: &mut MutexGuard<'_, T>) {
        self.inner.wait(guard);
    }

    /// Block until `blocked` returns `false`.
    #[inline]
    pub fn wait_while<T, F>(&self, guard: &mut MutexGuard<'_, T>, blocked: F)
    where
        F: FnMut(&mut T) -> bool,
    {
        self.inner.wait_while(guard, blocked);
    }

    /// Block until notified or `deadline` passes. Returns `true` on timeout.
    #[inline]
    pub fn wait_until<T>(&self, guard: &mut MutexGuard<'_, T>, deadline: Instant) -> bool {
        self.inner.wait_until(guard, deadline).timed_out()
    }

    /// Block while `blocked` holds, for at most `timeout`.
    ///
    /// Returns immediately when `blocked` is already `false`, whatever the
    /// timeout. A deadline too far out to represent waits forever.
    ///
    /// # Errors
    ///
    /// - `TaskError::WouldBlock` if `timeout` is [`Timeout::Poll`] or a zero
    ///   [`Timeout::After`] and `blocked` holds
    /// - `TaskError::TimedOut` if the deadline passes while `blocked` still holds
    pub fn wait_timeout_while<T, F>(
        &self,
        guard: &mut MutexGuard<'_, T>,
        timeout: Timeout,
        mut blocked: F,
    ) -> TaskResult<()>
    where
        F: FnMut(&mut T) -> bool,
    {
        if !blocked(&mut **guard) {
            return Ok(());
        }
        match (timeout, timeout.deadline()) {
            (Timeout::Poll, _) => Err(TaskError::WouldBlock),
            (Timeout::After(d), _) if d.is_zero() => Err(TaskError::WouldBlock),
            (Timeout::After(_), Some(deadline)) => {
                while blocked(&mut **guard) {
                    if self.wait_until(guard, deadline) && blocked(&mut **guard) {
                        return Err(TaskError::TimedOut);
                    }
                }
                Ok(())
            }
            (Timeout::Infinite | Timeout::After(_), _) => {
                self.inner.wait_while(guard, blocked);
                Ok(())
            }
        }
    }

    /// Wake one waiter.
    #[inline]
    pub fn notify_one(&self) {
        self.inner.notify_one();
    }

    /// Wake every waiter.
    #[inline]
    pub fn notify_all(&self) {
        self.inner.notify_all();
    }
}
