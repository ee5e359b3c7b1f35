//! Timeout specification shared by every blocking primitive.

use std::time::{Duration, Instant};

/// How long a blocking call may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// Do not wait; fail with `WouldBlock` if the condition is not met.
    Poll,
    /// Wait at most this long; fail with `TimedOut` afterwards.
    After(Duration),
    /// Wait until the condition is met.
    Infinite,
}

impl Timeout {
    /// Timeout from milliseconds, mapping `0` to [`Timeout::Poll`].
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self::Poll
        } else {
            Self::After(Duration::from_millis(ms))
        }
    }

    /// Replace [`Timeout::Infinite`] with a bounded wait of `cap`.
    #[must_use]
    pub const fn capped(self, cap: Duration) -> Self {
        match self {
            Self::Infinite => Self::After(cap),
            other => other,
        }
    }

    /// Absolute deadline, or `None` for polls and infinite waits.
    #[must_use]
    pub fn deadline(self) -> Option<Instant> {
        match self {
            Self::After(d) => Instant::now().checked_add(d),
            Self::Poll | Self::Infinite => None,
        }
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        if d.is_zero() {
            Self::Poll
        } else {
            Self::After(d)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_millis() {
        assert_eq!(Timeout::from_millis(0), Timeout::Poll);
        assert_eq!(
            Timeout::from_millis(25),
            Timeout::After(Duration::from_millis(25))
        );
    }

    #[test]
    fn test_capped_only_touches_infinite() {
        let cap = Duration::from_secs(60);
        assert_eq!(Timeout::Infinite.capped(cap), Timeout::After(cap));
        assert_eq!(Timeout::Poll.capped(cap), Timeout::Poll);
        let short = Timeout::After(Duration::from_millis(5));
        assert_eq!(short.capped(cap), short);
    }

    #[test]
    fn test_zero_duration_is_poll() {
        assert_eq!(Timeout::from(Duration::ZERO), Timeout::Poll);
    }
}
