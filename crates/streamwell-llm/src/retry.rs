//! Fixed-delay retry helper.
//!
//! Used for one-shot requests such as health probes. The live streaming
//! call does not go through here; it uses the per-provider failover in
//! [`crate::failover`].

use std::future::Future;
use std::time::Duration;

use streamwell_types::RequestConfig;
use tracing::{debug, warn};

use crate::error::{Result, StreamError};

/// Attempt count and fixed inter-attempt delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first (default: 3).
    pub attempts: u32,
    /// Pause between attempts (default: 1 second).
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl From<&RequestConfig> for RetryConfig {
    fn from(config: &RequestConfig) -> Self {
        Self {
            attempts: config.retry_times,
            delay: config.retry_delay(),
        }
    }
}

/// Determines whether a [`StreamError`] should be retried.
pub fn is_retryable(err: &StreamError) -> bool {
    err.is_retryable()
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. The last error is returned unchanged.
///
/// `op` receives the 1-based attempt number.
pub async fn retry_with<T, F, Fut>(config: &RetryConfig, label: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(label, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if !is_retryable(&err) => {
                debug!(label, attempt, error = %err, "non-retryable error");
                return Err(err);
            }
            Err(err) if attempt >= attempts => {
                warn!(label, attempts, error = %err, "retry budget spent");
                return Err(err);
            }
            Err(err) => {
                warn!(
                    label,
                    attempt,
                    max_attempts = attempts,
                    delay_ms = config.delay.as_millis() as u64,
                    error = %err,
                    "retryable error, will retry"
                );
                tokio::time::sleep(config.delay).await;
                attempt += 1;
            }
        }
    }
}
