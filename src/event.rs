//! Boolean event flag with auto-reset or manual-reset semantics.
//!
//! A manual-reset [`Event`] stays set until [`Event::reset`] is called and
//! releases every waiter. An auto-reset event is cleared atomically by the
//! waiter that observes it set, so each `set` releases at most one waiter.
//!
//! ```
//! use prometheus_taskpool::{Event, EventMode, Timeout};
//!
//! let ev = Event::new(EventMode::AutoReset, false, true);
//! assert!(ev.wait(Timeout::Poll).is_ok());
//! // consumed by the first waiter
//! assert!(ev.wait(Timeout::Poll).is_err());
//! ```

use crate::core::error::{RecordErrno, TaskResult};
use crate::util::Timeout;
use crate::{Condvar, Mutex};

/// Reset behaviour of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventMode {
    /// Stays set until explicitly reset.
    ManualReset,
    /// Cleared by the waiter that observes it set.
    AutoReset,
}

/// A settable flag threads can block on.
#[derive(Debug)]
pub struct Event {
    state: Mutex<bool>,
    cond: Condvar,
    mode: EventMode,
    broadcast: bool,
}

impl Event {
    /// Create an event.
    ///
    /// `broadcast` wakes every waiter on `set` instead of a single one. A
    /// manual-reset event always wakes everyone since nobody consumes it.
    #[must_use]
    pub const fn new(mode: EventMode, broadcast: bool, initial: bool) -> Self {
        Self {
            state: Mutex::new(initial),
            cond: Condvar::new(),
            mode,
            broadcast,
        }
    }

    /// Manual-reset event with broadcast wakeups.
    #[must_use]
    pub const fn manual(initial: bool) -> Self {
        Self::new(EventMode::ManualReset, true, initial)
    }

    /// Auto-reset event waking a single waiter per `set`.
    #[must_use]
    pub const fn auto(initial: bool) -> Self {
        Self::new(EventMode::AutoReset, false, initial)
    }

    /// Reset mode this event was created with.
    #[must_use]
    pub const fn mode(&self) -> EventMode {
        self.mode
    }

    /// Set the flag and wake waiters.
    pub fn set(&self) {
        let mut state = self.state.lock();
        *state = true;
        if self.broadcast || self.mode == EventMode::ManualReset {
            self.cond.notify_all();
        } else {
            self.cond.notify_one();
        }
    }

    /// Clear the flag.
    pub fn reset(&self) {
        *self.state.lock() = false;
    }

    /// Current flag value, without consuming an auto-reset event.
    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.state.lock()
    }

    /// Wait for the flag to become set.
    ///
    /// # Errors
    ///
    /// - `TaskError::WouldBlock` if `timeout` is [`Timeout::Poll`] and the flag is clear
    /// - `TaskError::TimedOut` if a bounded wait expires
    pub fn wait(&self, timeout: Timeout) -> TaskResult<()> {
        let mut state = self.state.lock();
        self.cond
            .wait_timeout_while(&mut state, timeout, |set| !*set)
            .record()?;
        if self.mode == EventMode::AutoReset {
            *state = false;
        }
        Ok(())
    }
}
