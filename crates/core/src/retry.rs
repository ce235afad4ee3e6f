//! Retry-with-backoff for transient failures against external services (§5, §7).

use crate::error::{ErrorKind, MomenarrError, Result};
use rand::Rng;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub enum RetryPolicy {
    /// Retry on any error.
    All,
    /// Retry only errors classified as `ErrorKind::Transient`.
    Transient,
    /// Never retry; `retry_with_backoff` degenerates to a single attempt.
    Never,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
    pub policy: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
            policy: RetryPolicy::Transient,
        }
    }
}

impl RetryConfig {
    /// A handful of fast retries, for idempotent in-process work.
    pub fn quick() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
            policy: RetryPolicy::Transient,
        }
    }

    /// Exactly one retry on a transient error, no backoff delay worth
    /// mentioning. Matches the indexer's "no rate-limit handling beyond a
    /// single retry on transient error" non-goal (§1).
    pub fn single_retry() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_millis(250),
            backoff_multiplier: 1.0,
            jitter: false,
            policy: RetryPolicy::Transient,
        }
    }

    /// Longer-spaced retries, for network calls to Trakt/the indexer/the downloader.
    pub fn slow() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            backoff_multiplier: 2.0,
            jitter: true,
            policy: RetryPolicy::Transient,
        }
    }

    fn should_retry(&self, error: &MomenarrError) -> bool {
        match self.policy {
            RetryPolicy::All => true,
            RetryPolicy::Transient => error.kind() == ErrorKind::Transient,
            RetryPolicy::Never => false,
        }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        let mut next = current.mul_f64(self.backoff_multiplier);
        if next > self.max_delay {
            next = self.max_delay;
        }
        if self.jitter {
            let jitter_factor = rand::thread_rng().gen_range(0.5..1.5);
            next = next.mul_f64(jitter_factor);
        }
        next
    }
}

/// Run `operation` up to `config.max_attempts` times, backing off between
/// attempts, retrying only while `config.policy` approves the error.
pub async fn retry_with_backoff<F, Fut, T>(
    operation_name: &str,
    config: &RetryConfig,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                if !config.should_retry(&error) {
                    return Err(error);
                }
                if attempt >= config.max_attempts {
                    return Err(MomenarrError::RetryExhausted {
                        operation: operation_name.to_string(),
                        attempts: attempt,
                        last_error: Box::new(error),
                    });
                }
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    %error,
                    "retrying after transient failure"
                );
                tokio::time::sleep(delay).await;
                delay = config.next_delay(delay);
            }
        }
    }
}
