//! Error types for the messaging bus and its clients

use tether_ipc::{Channel, FailureReason, TransportFailure};
use thiserror::Error;

/// A send that failed for good, after retries if any were allowed
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Delivery to {channel} failed after {attempts} attempt(s): {failure}")]
pub struct BusError {
    pub channel: Channel,
    pub attempts: u32,
    pub failure: TransportFailure,
}

impl BusError {
    pub fn reason(&self) -> FailureReason {
        self.failure.reason
    }

    /// True when retries were exhausted on transient failures
    pub fn is_transient(&self) -> bool {
        self.failure.is_retryable()
    }
}

/// Dialog argument lookup errors
#[derive(Debug, Error)]
pub enum DialogError {
    #[error("Dialog {dialog_id} did not provide its arguments within {waited_ms} ms: {last_error}")]
    NotReady {
        dialog_id: String,
        waited_ms: u128,
        last_error: String,
    },

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}

/// Preference lookup errors
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("Preference store rejected {key}: {message}")]
    Rejected { key: String, message: String },

    #[error("Malformed preference response: {0}")]
    MalformedResponse(String),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}
