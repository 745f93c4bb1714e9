//! Retry policy and the generic retry helper
//!
//! A [`RetryPolicy`] describes how many attempts an operation gets and how
//! long to wait between them; [`RetryPolicy::run`] drives any fallible async
//! operation under that policy.

use crate::config::RetryConfig;
use crate::HarvestError;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for HarvestError {
    fn is_retryable(&self) -> bool {
        HarvestError::is_retryable(self)
    }
}

/// Bounded exponential backoff
///
/// Attempt 1 runs immediately. Before attempt `n >= 2` the policy waits
/// `base_delay * 2^(n - 2)`, so the default policy waits 10s, 20s, 40s and
/// 80s before attempts 2 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(10),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given attempt budget and base delay
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Returns the wait before the given 1-based attempt
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 2);
        self.base_delay.saturating_mul(factor)
    }

    /// Runs `operation` until it succeeds, fails permanently, or the attempt
    /// budget is spent
    ///
    /// `operation` receives the 1-based attempt number. A non-retryable error
    /// is returned at once. When every attempt fails, the last error is
    /// returned unchanged. Each failed attempt is logged.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use sumi_harvest::fetch::RetryPolicy;
    /// use sumi_harvest::HarvestError;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let policy = RetryPolicy::new(3, Duration::from_millis(1));
    /// let result: Result<u32, HarvestError> = policy
    ///     .run("example", |attempt| async move {
    ///         if attempt < 3 {
    ///             Err(HarvestError::HttpStatus { url: "x".into(), status: 503 })
    ///         } else {
    ///             Ok(attempt)
    ///         }
    ///     })
    ///     .await;
    /// assert_eq!(result.unwrap(), 3);
    /// # }
    /// ```
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        E: Retryable + Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;

        loop {
            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Err(error);
            }

            if attempt >= self.max_attempts {
                tracing::warn!(
                    "Giving up on {} after attempt {}/{}: {}",
                    label,
                    attempt,
                    self.max_attempts,
                    error
                );
                return Err(error);
            }

            let delay = self.delay_before(attempt + 1);
            tracing::warn!(
                "Attempt {}/{} for {} failed, retrying in {:?}: {}",
                attempt,
                self.max_attempts,
                label,
                delay,
                error
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
