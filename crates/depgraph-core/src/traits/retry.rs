//! Retry with exponential backoff for `BackendUnavailable` failures.

use std::time::Duration;

use crate::errors::GraphError;

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(25),
            max_delay: Duration::from_secs(1),
        }
    }
}

/// Run `op`, retrying retryable graph errors with doubling delays.
/// Non-retryable errors and the final failure are returned as-is.
pub fn with_backoff<T, F>(policy: BackoffPolicy, mut op: F) -> Result<T, GraphError>
where
    F: FnMut() -> Result<T, GraphError>,
{
    let mut delay = policy.initial_delay;
    let mut attempt = 1;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                tracing::warn!(attempt, error = %e, "graph backend unavailable, retrying");
                std::thread::sleep(delay);
                delay = (delay * 2).min(policy.max_delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
