//! Backoff strategies for retry policies

use std::time::Duration;

/// Backoff strategy for retries
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Same delay before every retry
    Fixed,

    /// Exponential increase: delay = initial_delay * base^(retry-1)
    Exponential {
        /// Base for exponential calculation (2.0 doubles every retry)
        base: f64,
    },
}

/// Backoff delay calculator
#[derive(Debug, Clone)]
pub struct BackoffCalculator {
    strategy: BackoffStrategy,
    initial_delay: Duration,
    max_delay: Duration,
}

impl BackoffCalculator {
    pub fn new(strategy: BackoffStrategy, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            strategy,
            initial_delay,
            max_delay,
        }
    }

    /// Delay to sleep before the given retry.
    ///
    /// `retry` is the 0-indexed attempt about to be made, so the first retry
    /// (the second attempt overall) is `1`. Attempt `0` never waits.
    pub fn delay_before(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let delay = match &self.strategy {
            BackoffStrategy::Fixed => self.initial_delay,
            BackoffStrategy::Exponential { base } => {
                let multiplier = base.powi(retry as i32 - 1);
                // Float-to-int casts saturate, so huge exponents clamp instead of wrapping.
                Duration::from_nanos((self.initial_delay.as_nanos() as f64 * multiplier) as u64)
            }
        };

        delay.min(self.max_delay)
    }
}
