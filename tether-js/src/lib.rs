//! Sandboxed JavaScript evaluation for Tether
//!
//! The sandbox sees nothing but the expression and its bindings: every
//! evaluation runs in a fresh Boa context with no host functions registered.

#[cfg(feature = "javascript")]
pub mod conversion;
#[cfg(feature = "javascript")]
pub mod error_handling;
#[cfg(feature = "javascript")]
pub mod evaluator;

use serde_json::{Map, Value as JsonValue};
use tether_ipc::EvalFailure;
use thiserror::Error;

#[cfg(feature = "javascript")]
pub use evaluator::{BoaEvaluator, EvaluatorLimits};

/// Capability to evaluate an expression against named bindings
///
/// Implementations live on the sandbox thread and need not be `Send`.
pub trait Evaluator {
    /// Evaluate `expression` as a program body with every binding visible by
    /// name, returning the value of its last expression. Exceptions thrown by
    /// the program come back as `EvalFailure`, never as panics.
    fn run(
        &mut self,
        expression: &str,
        bindings: &Map<String, JsonValue>,
    ) -> Result<JsonValue, EvalFailure>;
}

/// Host-side failures around an evaluation
#[derive(Error, Debug)]
pub enum JsExecutionError {
    #[error("Invalid binding name: {0}")]
    InvalidBinding(String),

    #[error("Input preparation error: {0}")]
    InputError(String),

    #[error("Output conversion error: {0}")]
    OutputError(String),

    #[error("Result could not be cloned: {0}")]
    NotCloneable(String),
}

impl From<JsExecutionError> for EvalFailure {
    fn from(err: JsExecutionError) -> Self {
        let name = match &err {
            JsExecutionError::InvalidBinding(_) => "SyntaxError",
            JsExecutionError::InputError(_) | JsExecutionError::OutputError(_) => "TypeError",
            JsExecutionError::NotCloneable(_) => "DataCloneError",
        };
        EvalFailure::new(name, err.to_string())
    }
}
