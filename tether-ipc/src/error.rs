//! IPC error types

use tether_resilience::Retryable;
use thiserror::Error;

/// Native text the host runtime reports when nobody listens on a channel
pub const NATIVE_NO_RECEIVER: &str =
    "Could not establish connection. Receiving end does not exist.";

/// Native text the host runtime reports when a listener never answers
pub const NATIVE_PORT_CLOSED: &str =
    "The message port closed before a response was received.";

/// Why a single transport send failed
///
/// Everything except `Fatal` is transient and worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The receiving end does not exist yet
    ReceiverMissing,
    /// A connection to the receiver could not be established
    ConnectionFailed,
    /// The port closed before a response arrived
    PortClosed,
    /// The acknowledgment timer fired first
    AckTimeout,
    /// A response arrived without an acknowledgment marker
    NoAck,
    /// Anything else, including errors raised by the receiver itself
    Fatal,
}

impl FailureReason {
    pub fn is_transient(self) -> bool {
        !matches!(self, FailureReason::Fatal)
    }
}

/// A classified failure of one transport send
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{detail}")]
pub struct TransportFailure {
    pub reason: FailureReason,
    pub detail: String,
}

impl TransportFailure {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }

    /// Translate error text reported by the host runtime
    pub fn from_native(text: impl Into<String>) -> Self {
        let detail = text.into();
        Self {
            reason: classify_native_error(&detail),
            detail,
        }
    }

    pub fn fatal(detail: impl Into<String>) -> Self {
        Self::new(FailureReason::Fatal, detail)
    }

    /// Check if this failure is retryable
    pub fn is_retryable(&self) -> bool {
        self.reason.is_transient()
    }

    /// Check if this failure must be surfaced without retrying
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable()
    }
}

impl Retryable for TransportFailure {
    fn is_retryable(&self) -> bool {
        TransportFailure::is_retryable(self)
    }
}

/// Map host runtime error text onto the closed set of failure reasons.
///
/// This is the only place where error messages are matched as strings.
pub fn classify_native_error(text: &str) -> FailureReason {
    let lower = text.to_ascii_lowercase();

    if lower.contains("receiving end does not exist") {
        FailureReason::ReceiverMissing
    } else if lower.contains("could not establish connection") {
        FailureReason::ConnectionFailed
    } else if lower.contains("message port closed") {
        FailureReason::PortClosed
    } else {
        FailureReason::Fatal
    }
}

/// Wire format errors
#[derive(Debug, Error)]
pub enum IpcError {
    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl From<serde_json::Error> for IpcError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            IpcError::DeserializationError(err.to_string())
        } else {
            IpcError::SerializationError(err.to_string())
        }
    }
}
