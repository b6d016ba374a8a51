//! Bounded retry with an injectable clock.
//!
//! Editors often truncate a file before writing it, and a change event can
//! arrive in between. [`RetryPolicy`] re-runs an operation a fixed number of
//! times while its error is transient, sleeping on a [`Clock`] between
//! attempts.
//!
//! ```text
//! attempt 1 ── Err(Empty) ── sleep 50ms ── attempt 2 ── Ok(record)
//! ```

use std::time::Duration;

use dw_core::ExtractConfig;

use crate::error::IndexError;

/// Source of delays between attempts.
pub trait Clock: Send + Sync {
    /// Blocks the current thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// [`Clock`] backed by [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Fixed-delay retry bound.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use dw_index::{IndexError, RetryPolicy, SystemClock};
///
/// let policy = RetryPolicy::new(3, Duration::from_millis(1));
/// let mut calls = 0;
/// let result = policy.run(&SystemClock, "a.go".into(), |_attempt| {
///     calls += 1;
///     if calls < 2 { Err(IndexError::empty("a.go")) } else { Ok(calls) }
/// });
/// assert_eq!(result.unwrap(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` counts the first attempt and is at
    /// least one.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// A policy that tries exactly once.
    #[must_use]
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Builds the policy from the extraction configuration.
    #[must_use]
    pub fn from_config(config: &ExtractConfig) -> Self {
        Self::new(config.max_attempts, config.retry_delay())
    }

    /// Maximum number of attempts.
    #[inline]
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay between attempts.
    #[inline]
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `op` until it succeeds, fails permanently, or runs out of
    /// attempts. `op` receives the 1-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns a non-transient error as soon as it occurs, or
    /// [`IndexError::RetriesExhausted`] wrapping the last transient error.
    pub fn run<T>(
        &self,
        clock: &dyn Clock,
        path: camino::Utf8PathBuf,
        mut op: impl FnMut(u32) -> Result<T, IndexError>,
    ) -> Result<T, IndexError> {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_transient() => return Err(error),
                Err(error) if attempt >= self.max_attempts => {
                    return Err(IndexError::RetriesExhausted {
                        path,
                        attempts: attempt,
                        source: Box::new(error),
                    });
                }
                Err(error) => {
                    tracing::debug!(
                        path = %path,
                        attempt,
                        error = %error,
                        "Source not ready, retrying"
                    );
                    clock.sleep(self.delay);
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ExtractConfig::default())
    }
}
