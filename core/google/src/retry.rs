//! Fixed-delay retry for transient remote failures.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use orgshare_common::{Error, Result};

/// Retry behavior: how many extra attempts, and how long to wait between them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before each retry.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with the default one-second delay.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            delay: Duration::from_secs(1),
        }
    }

    /// Set the delay between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self::new(0)
    }

    /// Run `operation`, retrying while `should_retry` accepts the error.
    ///
    /// Errors rejected by `should_retry` propagate immediately. Once retries
    /// are exhausted the last error is returned.
    pub async fn execute_with_condition<F, Fut, T, C>(
        &self,
        operation: F,
        should_retry: C,
    ) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
        C: Fn(&Error) -> bool,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("Operation succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if !should_retry(&err) || attempt >= self.max_retries {
                        return Err(err);
                    }

                    attempt += 1;
                    warn!(
                        retries_left = self.max_retries - attempt,
                        "Attempt {} failed: {}. Retrying in {:?}...", attempt, err, self.delay
                    );
                    sleep(self.delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}
