//! Bounded retry for volatile external calls.
//!
//! Embedding and generation are network-backed and may fail transiently.
//! [`retry_with_policy`] wraps any fallible async operation with a fixed
//! number of attempts and a fixed inter-attempt pause, re-raising the last
//! error once attempts are exhausted. There is no exponential backoff,
//! jitter, or circuit breaking.
//!
//! Observation is injected through [`RetryObserver`] rather than a
//! process-wide logger, so callers control where attempt telemetry goes;
//! [`TracingObserver`] routes it to the `tracing` stack.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::config::{RETRY_ATTEMPTS, RETRY_PAUSE_MS};

/// Fixed-attempt retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of attempts (including the first call). Treated as at
    /// least 1.
    pub attempts: usize,
    /// Fixed pause between consecutive attempts.
    pub pause: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the given attempt count and pause.
    pub fn new(attempts: usize, pause: Duration) -> Self {
        Self { attempts, pause }
    }

    /// Creates a policy that retries immediately, without pausing.
    pub fn without_pause(attempts: usize) -> Self {
        Self::new(attempts, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RETRY_ATTEMPTS, Duration::from_millis(RETRY_PAUSE_MS))
    }
}

/// Observer for retry attempts.
///
/// Injected into [`retry_with_policy`]; implementations decide where
/// attempt telemetry goes.
pub trait RetryObserver: Send + Sync {
    /// Called before each attempt. `attempt` is 1-based.
    fn on_attempt(&self, attempt: usize, attempts: usize);

    /// Called after a failed attempt with the error's display form.
    fn on_failure(&self, attempt: usize, error: &str);
}

/// Observer that logs attempts at debug level via `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RetryObserver for TracingObserver {
    fn on_attempt(&self, attempt: usize, attempts: usize) {
        debug!(attempt, attempts, "running retried operation");
    }

    fn on_failure(&self, attempt: usize, error: &str) {
        debug!(attempt, error, "retried operation failed");
    }
}

/// Runs `operation` under the bounded-retry policy.
///
/// Returns the first success. After a failure, notifies the observer,
/// pauses for `policy.pause`, and tries again; the error from the final
/// attempt is returned as-is.
pub async fn retry_with_policy<T, E, F, Fut>(
    policy: &RetryPolicy,
    observer: &dyn RetryObserver,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        observer.on_attempt(attempt, attempts);
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                observer.on_failure(attempt, &error.to_string());
                if attempt == attempts {
                    return Err(error);
                }
                if !policy.pause.is_zero() {
                    tokio::time::sleep(policy.pause).await;
                }
                attempt += 1;
            }
        }
    }
}
