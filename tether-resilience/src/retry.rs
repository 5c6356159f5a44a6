//! Retry policy and executor

use log::{debug, info, warn};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::backoff::{BackoffCalculator, BackoffStrategy};

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, the first one included
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Backoff strategy
    pub backoff_strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3, Duration::from_millis(150))
    }
}

impl RetryPolicy {
    /// Doubling backoff with `max_retries` retries after the first attempt.
    ///
    /// Delays are not capped: the wait before retry `k` is exactly
    /// `base * 2^(k-1)`.
    pub fn exponential(max_retries: u32, base: Duration) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
            initial_delay: base,
            max_delay: Duration::MAX,
            backoff_strategy: BackoffStrategy::Exponential { base: 2.0 },
        }
    }

    /// Poll at a fixed interval until `window` has been covered.
    pub fn fixed_window(interval: Duration, window: Duration) -> Self {
        let attempts = if interval.is_zero() {
            1
        } else {
            let steps = (window.as_millis() / interval.as_millis().max(1)).max(1);
            u32::try_from(steps).unwrap_or(u32::MAX)
        };

        Self {
            max_attempts: attempts,
            initial_delay: interval,
            max_delay: interval,
            backoff_strategy: BackoffStrategy::Fixed,
        }
    }

    /// Delay before the 0-indexed attempt `attempt`
    pub fn delay_before(&self, attempt: u32) -> Duration {
        BackoffCalculator::new(
            self.backoff_strategy.clone(),
            self.initial_delay,
            self.max_delay,
        )
        .delay_before(attempt)
    }
}

/// Trait for errors that can be retried
pub trait Retryable {
    /// Whether this error is worth another attempt
    fn is_retryable(&self) -> bool;
}

/// Retry executor
pub struct RetryExecutor {
    policy: RetryPolicy,
    label: String,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            label: "operation".to_string(),
        }
    }

    /// Name used in the per-attempt diagnostics
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute a function with retry logic
    pub async fn execute<F, Fut, T, E>(&self, mut f: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        self.execute_with_context(|_attempt| f()).await
    }

    /// Execute a function with retry logic, passing the 0-indexed attempt
    ///
    /// Attempts are strictly sequential. A non-retryable error ends the loop
    /// at once; a retryable one sleeps the policy's backoff unless the
    /// attempt budget is spent.
    pub async fn execute_with_context<F, Fut, T, E>(&self, mut f: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            debug!(
                "{}: attempt {} of {}",
                self.label,
                attempt + 1,
                max_attempts
            );

            match f(attempt).await {
                Ok(result) => {
                    if attempt > 0 {
                        info!("{} succeeded after {} attempts", self.label, attempt + 1);
                    }
                    return Ok(result);
                }
                Err(error) => {
                    let attempts = attempt + 1;

                    if !error.is_retryable() {
                        warn!("{} failed with non-retryable error: {}", self.label, error);
                        return Err(RetryError::NonRetryable { attempts, error });
                    }

                    if attempts >= max_attempts {
                        warn!("{} failed after {} attempts: {}", self.label, attempts, error);
                        return Err(RetryError::MaxAttemptsExceeded {
                            attempts,
                            last_error: error,
                        });
                    }

                    attempt += 1;
                    let delay = self.policy.delay_before(attempt);
                    warn!(
                        "{} attempt {}/{} failed: {}. Retrying in {:?}",
                        self.label, attempts, max_attempts, error, delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Retry error types
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    /// Attempt budget spent on retryable errors
    #[error("Maximum retry attempts ({attempts}) exceeded. Last error: {last_error}")]
    MaxAttemptsExceeded { attempts: u32, last_error: E },

    /// Non-retryable error encountered
    #[error("Non-retryable error: {error}")]
    NonRetryable { attempts: u32, error: E },
}

impl<E> RetryError<E> {
    /// Get the underlying error
    pub fn into_inner(self) -> E {
        match self {
            RetryError::MaxAttemptsExceeded { last_error, .. } => last_error,
            RetryError::NonRetryable { error, .. } => error,
        }
    }

    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::MaxAttemptsExceeded { attempts, .. }
            | RetryError::NonRetryable { attempts, .. } => *attempts,
        }
    }
}
