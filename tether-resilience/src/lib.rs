//! Resilience patterns for Tether
//!
//! This crate provides the retry executor and backoff calculations used by
//! the messaging bus and by caller-level polling clients.

pub mod backoff;
pub mod retry;

// Re-export commonly used types
pub use backoff::{BackoffCalculator, BackoffStrategy};
pub use retry::{RetryError, RetryExecutor, RetryPolicy, Retryable};
