//! Retry/backoff engine for a single provider call.
//!
//! Retries only failures that [`ProviderError::is_retryable`] accepts,
//! doubling the delay after each attempt up to a cap. Terminal failures are
//! returned after the first attempt. The engine knows nothing about
//! providers; it wraps any closure producing an [`OperationResult`].
//!
//! Dropping the future returned by [`with_retry`] cancels the in-flight
//! attempt and any pending backoff sleep.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use lectio_core::config::RetryConfig;
use lectio_core::OperationResult;

/// Bounded exponential backoff parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Treated as at least 1.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay slept after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            initial_delay: Duration::from_millis(cfg.initial_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
        }
    }
}

/// Run `op` until it succeeds, fails terminally, or attempts run out.
///
/// `label` identifies the call in logs (e.g. `"openai/key_takeaway"`).
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> OperationResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = OperationResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(call = label, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => {
                debug!(call = label, attempt, error = %e, kind = e.kind(), "terminal failure, not retrying");
                return Err(e);
            }
            Err(e) if attempt >= max_attempts => {
                warn!(call = label, attempts = attempt, error = %e, "retries exhausted");
                return Err(e);
            }
            Err(e) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    call = label,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
