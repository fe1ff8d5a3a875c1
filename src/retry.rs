//! Retry with exponential backoff.
//!
//! The policy is an immutable value; [`execute`] is a plain value-returning
//! loop parameterized by it. Attempts are strictly sequential, the first
//! success wins, and after exhaustion the last error is returned.

use std::{fmt::Display, future::Future, time::Duration};

use serde::{Deserialize, Serialize};

/// Backoff/attempt policy for one guarded write.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the second attempt, in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Multiplier applied to the backoff after every failed attempt.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Upper bound on a single backoff interval, in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            multiplier: default_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    100
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

impl RetryPolicy {
    /// Backoff interval after the given failed attempt (0-indexed), capped at
    /// `max_backoff_ms`.
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let backoff_ms =
            (self.initial_backoff_ms as f64 * self.multiplier.powi(attempt as i32)) as u64;
        Duration::from_millis(backoff_ms).min(Duration::from_millis(self.max_backoff_ms))
    }
}

/// Runs `operation` until it succeeds or the policy's attempts are exhausted,
/// sleeping the policy's backoff between attempts.
///
/// # Errors
///
/// Returns the error from the last attempt when all attempts fail.
pub async fn execute<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if last_attempt + 1 < attempts => {
                let backoff = policy.backoff_for_attempt(last_attempt);
                tracing::warn!(
                    attempt = last_attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "attempt failed, backing off"
                );
                tokio::time::sleep(backoff).await;
                last_attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
