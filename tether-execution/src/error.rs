//! Error types for sandboxed evaluation

use std::time::Duration;
use tether_ipc::EvalFailure;
use thiserror::Error;

/// Diagnostic code attached to every error raised by evaluated code
pub const EVAL_ERROR_CODE: &str = "SANDBOX_EVAL_ERROR";

/// Evaluation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("No sandbox registered")]
    NoSandbox,

    #[error("Sandbox unavailable: {0}")]
    SandboxUnavailable(String),

    #[error("Sandbox message is missing its correlation id")]
    MissingCorrelationId,

    #[error("Invalid sandbox message: {0}")]
    InvalidMessage(String),

    /// The evaluated code threw
    #[error("{message}")]
    Evaluation { name: String, message: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl ExecutionError {
    /// Stable code reported to callers alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            ExecutionError::Evaluation { .. } => EVAL_ERROR_CODE,
            ExecutionError::Timeout(_) => "SANDBOX_TIMEOUT",
            ExecutionError::NoSandbox | ExecutionError::SandboxUnavailable(_) => {
                "SANDBOX_UNAVAILABLE"
            }
            ExecutionError::MissingCorrelationId | ExecutionError::InvalidMessage(_) => {
                "SANDBOX_PROTOCOL_ERROR"
            }
        }
    }
}

impl From<EvalFailure> for ExecutionError {
    fn from(failure: EvalFailure) -> Self {
        ExecutionError::Evaluation {
            name: failure.name,
            message: failure.message,
        }
    }
}
