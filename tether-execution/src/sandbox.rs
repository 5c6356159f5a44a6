//! Sandbox host
//!
//! The sandbox owns its evaluator on a dedicated thread. Requests and
//! responses cross the boundary as JSON values only.

use serde_json::Value as JsonValue;
use std::thread;
use tether_ipc::{EvalResult, SandboxRequest, SandboxResponse};
use tether_js::{BoaEvaluator, Evaluator, EvaluatorLimits};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::ExecutionError;

/// Inbound channel of a sandbox
#[derive(Debug, Clone)]
pub struct SandboxPort {
    tx: mpsc::UnboundedSender<JsonValue>,
}

impl SandboxPort {
    pub fn new(tx: mpsc::UnboundedSender<JsonValue>) -> Self {
        Self { tx }
    }

    pub fn post(&self, message: JsonValue) -> Result<(), ExecutionError> {
        self.tx
            .send(message)
            .map_err(|_| ExecutionError::SandboxUnavailable("sandbox channel closed".to_string()))
    }
}

/// A running sandbox thread
///
/// The thread exits once every `SandboxPort` clone has been dropped.
pub struct SandboxHost {
    port: SandboxPort,
    responses: Option<mpsc::UnboundedReceiver<JsonValue>>,
    _thread: thread::JoinHandle<()>,
}

impl SandboxHost {
    /// Start a sandbox whose evaluator is built on the sandbox thread
    pub fn spawn<F, E>(make_evaluator: F) -> Result<Self, ExecutionError>
    where
        F: FnOnce() -> E + Send + 'static,
        E: Evaluator + 'static,
    {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<JsonValue>();
        let (response_tx, response_rx) = mpsc::unbounded_channel::<JsonValue>();

        let thread = thread::Builder::new()
            .name("tether-sandbox".to_string())
            .spawn(move || {
                let mut evaluator = make_evaluator();
                info!("Sandbox started");

                while let Some(message) = request_rx.blocking_recv() {
                    let Some(response) = handle_request(&mut evaluator, message) else {
                        continue;
                    };
                    if response_tx.send(response).is_err() {
                        debug!("Broker stopped listening, shutting sandbox down");
                        break;
                    }
                }

                info!("Sandbox stopped");
            })
            .map_err(|e| ExecutionError::SandboxUnavailable(e.to_string()))?;

        Ok(Self {
            port: SandboxPort::new(request_tx),
            responses: Some(response_rx),
            _thread: thread,
        })
    }

    /// Start a sandbox backed by a fresh Boa context per evaluation
    pub fn spawn_boa(limits: EvaluatorLimits) -> Result<Self, ExecutionError> {
        Self::spawn(move || BoaEvaluator::new(limits))
    }

    pub fn port(&self) -> SandboxPort {
        self.port.clone()
    }

    /// Outbound channel; can be taken once
    pub fn take_responses(&mut self) -> Option<mpsc::UnboundedReceiver<JsonValue>> {
        self.responses.take()
    }
}

/// Evaluate one inbound message. Messages that are not well-formed eval
/// requests are dropped without a response.
pub fn handle_request<E: Evaluator + ?Sized>(
    evaluator: &mut E,
    message: JsonValue,
) -> Option<JsonValue> {
    let request: SandboxRequest = match serde_json::from_value(message) {
        Ok(request) => request,
        Err(e) => {
            debug!("Ignoring malformed sandbox request: {}", e);
            return None;
        }
    };

    let SandboxRequest::Eval {
        id,
        expression,
        bindings,
    } = request;

    let result = match evaluator.run(&expression, &bindings) {
        Ok(value) => EvalResult::success(id, value),
        Err(failure) => {
            debug!(%id, "Evaluation raised {}", failure);
            EvalResult::failure(id, failure)
        }
    };

    match serde_json::to_value(SandboxResponse::EvalResult(result)) {
        Ok(response) => Some(response),
        Err(e) => {
            warn!(%id, "Failed to encode evaluation result: {}", e);
            None
        }
    }
}
