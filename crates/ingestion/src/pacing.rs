//! Pacing of calls to external sources.
//!
//! Waiting is routed through a [`Sleeper`] so tests can run without real
//! delays. [`Poller`] waits for a condition with a bounded timeout instead
//! of sleeping for a fixed period and hoping the content is ready.

use lotscout_core::{Error, Result};
use std::time::Duration;

/// Something that can block the current thread for a while.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps on the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Bounded polling for a condition.
///
/// Elapsed time is accounted from the intervals slept, so a check that
/// itself blocks does not shorten the budget.
#[derive(Debug, Clone)]
pub struct Poller<S: Sleeper = ThreadSleeper> {
    timeout: Duration,
    interval: Duration,
    sleeper: S,
}

impl<S: Sleeper> Poller<S> {
    /// Create a poller with a custom sleeper.
    pub fn with_sleeper(timeout: Duration, interval: Duration, sleeper: S) -> Self {
        Self {
            timeout,
            interval: interval.max(Duration::from_millis(1)),
            sleeper,
        }
    }

    /// Call `check` until it yields a value or the timeout is spent.
    ///
    /// The check runs once more after the last sleep, so a condition that
    /// becomes ready exactly at the deadline is still seen. Check errors
    /// abort the wait.
    pub fn wait_for<T, F>(&mut self, mut check: F) -> Result<T>
    where
        F: FnMut() -> Result<Option<T>>,
    {
        let mut elapsed = Duration::ZERO;
        loop {
            if let Some(value) = check()? {
                return Ok(value);
            }
            if elapsed >= self.timeout {
                return Err(Error::Timeout(self.timeout.as_millis() as u64));
            }
            let step = self.interval.min(self.timeout - elapsed);
            self.sleeper.sleep(step);
            elapsed += step;
        }
    }

    /// Pause unconditionally, e.g. between two requests.
    pub fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            self.sleeper.sleep(duration);
        }
    }

    /// The underlying sleeper.
    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Vec<Duration>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&mut self, duration: Duration) {
            self.slept.push(duration);
        }
    }

    fn poller(timeout_ms: u64, interval_ms: u64) -> Poller<RecordingSleeper> {
        Poller::with_sleeper(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(interval_ms),
            RecordingSleeper::default(),
        )
    }

    #[test]
    fn test_ready_immediately() {
        let mut p = poller(1000, 100);
        let value = p.wait_for(|| Ok(Some(42))).unwrap();
        assert_eq!(value, 42);
        assert!(p.sleeper().slept.is_empty());
    }

    #[test]
    fn test_ready_after_polls() {
        let mut p = poller(1000, 100);
        let mut calls = 0;
        let value = p
            .wait_for(|| {
                calls += 1;
                Ok((calls == 3).then_some("ready"))
            })
            .unwrap();
        assert_eq!(value, "ready");
        assert_eq!(p.sleeper().slept.len(), 2);
    }

    #[test]
    fn test_timeout() {
        let mut p = poller(250, 100);
        let err = p.wait_for(|| Ok(None::<()>)).unwrap_err();
        assert!(matches!(err, Error::Timeout(250)));

        let total: Duration = p.sleeper().slept.iter().sum();
        assert_eq!(total, Duration::from_millis(250));
        assert_eq!(p.sleeper().slept.last(), Some(&Duration::from_millis(50)));
    }

    #[test]
    fn test_check_error_aborts() {
        let mut p = poller(1000, 100);
        let err = p
            .wait_for(|| Err::<Option<()>, _>(Error::external("page gone")))
            .unwrap_err();
        assert!(matches!(err, Error::External(_)));
        assert!(p.sleeper().slept.is_empty());
    }

    #[test]
    fn test_pause_skips_zero() {
        let mut p = poller(1000, 100);
        p.pause(Duration::ZERO);
        p.pause(Duration::from_millis(600));
        assert_eq!(p.sleeper().slept, vec![Duration::from_millis(600)]);
    }
}
