// src/retry.rs
//! Bounded retry with a fixed delay between attempts.

use metrics::counter;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Total attempts, including the first one.
pub const MAX_RETRIES: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Whether another attempt could plausibly succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool {
        true
    }
}

impl Retryable for anyhow::Error {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            delay: RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` of 0 is treated as 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Worst-case time spent sleeping for one call site.
    pub fn worst_case_delay(&self) -> Duration {
        self.delay * self.max_attempts.saturating_sub(1)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. The last error is returned unchanged.
///
/// Every failed attempt that will be retried emits one WARN event; the
/// final failure emits one ERROR event.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        debug!(label, attempt, max_attempts, "attempt");
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_attempts && e.is_retryable() => {
                warn!(
                    label,
                    attempt,
                    max_attempts,
                    error = %e,
                    "attempt failed, retrying in {:?}",
                    policy.delay
                );
                counter!("digest_retry_attempts_total").increment(1);
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    error!(label, attempts = attempt, error = %e, "retries exhausted");
                } else {
                    error!(label, attempt, error = %e, "non-retryable failure");
                }
                return Err(e);
            }
        }
    }
}
