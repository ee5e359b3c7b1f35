//! Bounded counting semaphore.

use crate::core::error::{RecordErrno, TaskError, TaskResult};
use crate::util::Timeout;
use crate::{Condvar, Mutex};

/// A counter that blocks waiters while it is zero.
///
/// ```
/// use prometheus_taskpool::{Semaphore, Timeout};
///
/// let sem = Semaphore::new(0);
/// sem.post(2).unwrap();
/// assert!(sem.wait(Timeout::Poll).is_ok());
/// assert_eq!(sem.value(), 1);
/// ```
#[derive(Debug)]
pub struct Semaphore {
    count: Mutex<usize>,
    cond: Condvar,
    max: usize,
}

impl Semaphore {
    /// Semaphore starting at `initial` with no practical upper bound.
    #[must_use]
    pub const fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            cond: Condvar::new(),
            max: usize::MAX,
        }
    }

    /// Semaphore whose value may never exceed `max`.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::InvalidArgument` if `initial > max`.
    pub fn bounded(initial: usize, max: usize) -> TaskResult<Self> {
        if initial > max {
            return Err(TaskError::InvalidArgument(format!(
                "initial value {initial} exceeds max {max}"
            )))
            .record();
        }
        Ok(Self {
            count: Mutex::new(initial),
            cond: Condvar::new(),
            max,
        })
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> usize {
        *self.count.lock()
    }

    /// Add `n` permits and wake up to `n` waiters.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::NoSpace` if the value would exceed the bound; the
    /// value is left unchanged in that case.
    pub fn post(&self, n: usize) -> TaskResult<()> {
        let mut count = self.count.lock();
        let next = count
            .checked_add(n)
            .filter(|v| *v <= self.max)
            .ok_or(TaskError::NoSpace)
            .record()?;
        *count = next;
        if n == 1 {
            self.cond.notify_one();
        } else if n > 1 {
            self.cond.notify_all();
        }
        Ok(())
    }

    /// Take one permit without blocking.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::WouldBlock` if the value is zero.
    pub fn try_wait(&self) -> TaskResult<()> {
        self.wait(Timeout::Poll)
    }

    /// Take one permit, waiting up to `timeout` for one to be posted.
    ///
    /// # Errors
    ///
    /// - `TaskError::WouldBlock` on a poll with no permit available
    /// - `TaskError::TimedOut` if a bounded wait expires
    pub fn wait(&self, timeout: Timeout) -> TaskResult<()> {
        let mut count = self.count.lock();
        self.cond
            .wait_timeout_while(&mut count, timeout, |c| *c == 0)
            .record()?;
        *count -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_poll_on_empty_semaphore() {
        let sem = Semaphore::new(0);
        assert_eq!(sem.try_wait(), Err(TaskError::WouldBlock));
        assert_eq!(sem.wait(Timeout::After(Duration::ZERO)), Err(TaskError::WouldBlock));
        assert_eq!(
            sem.wait(Timeout::After(Duration::from_millis(10))),
            Err(TaskError::TimedOut)
        );
    }

    #[test]
    fn test_post_and_wait_track_value() {
        let sem = Semaphore::new(1);
        sem.post(3).unwrap();
        assert_eq!(sem.value(), 4);
        for _ in 0..4 {
            sem.try_wait().unwrap();
        }
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn test_bounded_rejects_overflow() {
        assert!(Semaphore::bounded(3, 2).is_err());

        let sem = Semaphore::bounded(1, 2).unwrap();
        sem.post(1).unwrap();
        assert_eq!(sem.post(1), Err(TaskError::NoSpace));
        assert_eq!(sem.value(), 2);
    }

    #[test]
    fn test_post_wakes_waiters() {
        let sem = Arc::new(Semaphore::new(0));
        let acquired = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];

        for _ in 0..3 {
            let sem = Arc::clone(&sem);
            let acquired = Arc::clone(&acquired);
            handles.push(thread::spawn(move || {
                if sem.wait(Timeout::After(Duration::from_secs(5))).is_ok() {
                    acquired.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }

        thread::sleep(Duration::from_millis(20));
        sem.post(3).unwrap();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(acquired.load(Ordering::SeqCst), 3);
        assert_eq!(sem.value(), 0);
    }
}
