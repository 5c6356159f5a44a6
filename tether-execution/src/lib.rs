//! Tether Execution Engine
//!
//! The evaluation broker relays expressions into an isolated sandbox and
//! matches results back to callers by correlation id. The sandbox runs on its
//! own thread and is reachable only through JSON message channels.

pub mod broker;
pub mod error;
pub mod pending;
pub mod sandbox;

// Re-export main types
pub use broker::{EvalBroker, DEFAULT_EVAL_TIMEOUT};
pub use error::{ExecutionError, EVAL_ERROR_CODE};
pub use pending::{EvalOutcome, PendingEvaluation, PendingTable};
pub use sandbox::{handle_request, SandboxHost, SandboxPort};
