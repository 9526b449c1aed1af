//! Retry with deterministic exponential backoff, and per-attempt timeouts.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::error::{AttemptError, TimeoutError};

/// Configuration for [`retry_with_backoff`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub delay: Duration,
    /// Factor applied to the delay after each further failure.
    pub backoff_multiplier: f64,
    /// Per-attempt timeout. `None` runs attempts inline with no limit.
    pub timeout: Option<Duration>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl RetryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sleep after failed attempt number `attempt` (1-based):
    /// `delay * multiplier^(attempt - 1)`.
    ///
    /// A negative or NaN multiplier is treated as 1.0, and a delay too large
    /// to represent saturates at [`Duration::MAX`].
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.delay.is_zero() {
            return Duration::ZERO;
        }
        let multiplier = if self.backoff_multiplier >= 0.0 {
            self.backoff_multiplier
        } else {
            1.0
        };
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let seconds = self.delay.as_secs_f64() * multiplier.powi(exponent);
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
    }
}

/// Runs `f` on a worker thread and waits at most `timeout` for it.
///
/// On timeout the worker is left to finish in the background; its result is
/// discarded.
pub fn with_timeout<T, F>(timeout: Duration, f: F) -> Result<T, TimeoutError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(timeout)
        .map_err(|_| TimeoutError { after: timeout })
}

/// Retries `operation` with exponential backoff.
///
/// `on_retry` is invoked with the failed attempt number and its error before
/// each sleep. After the final attempt the last error is returned without
/// sleeping.
pub fn retry_with_backoff<T, E, F>(
    operation: F,
    options: &RetryOptions,
    on_retry: Option<&dyn Fn(u32, &AttemptError<E>)>,
) -> Result<T, AttemptError<E>>
where
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    retry_with_backoff_using(operation, options, on_retry, &mut thread::sleep)
}

/// [`retry_with_backoff`] with an injectable sleep function.
pub fn retry_with_backoff_using<T, E, F>(
    operation: F,
    options: &RetryOptions,
    on_retry: Option<&dyn Fn(u32, &AttemptError<E>)>,
    sleep: &mut dyn FnMut(Duration),
) -> Result<T, AttemptError<E>>
where
    F: Fn() -> Result<T, E> + Send + Sync + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let operation = Arc::new(operation);
    let max_attempts = options.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = match options.timeout {
            Some(limit) => {
                let op = Arc::clone(&operation);
                match with_timeout(limit, move || op()) {
                    Ok(result) => result.map_err(AttemptError::Operation),
                    Err(timeout) => Err(AttemptError::TimedOut(timeout)),
                }
            }
            None => operation().map_err(AttemptError::Operation),
        };

        let err = match outcome {
            Ok(value) => {
                if attempt > 1 {
                    debug!("Operation succeeded on attempt {attempt}/{max_attempts}");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if attempt >= max_attempts {
            warn!("Operation failed after {max_attempts} attempts");
            return Err(err);
        }

        if let Some(cb) = on_retry {
            cb(attempt, &err);
        }
        let delay = options.delay_for(attempt);
        debug!(
            "Attempt {attempt}/{max_attempts} failed, retrying in {}ms",
            delay.as_millis()
        );
        sleep(delay);
        attempt += 1;
    }
}
