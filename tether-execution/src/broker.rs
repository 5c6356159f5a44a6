//! Evaluation broker
//!
//! Relays `evaluate` calls into the registered sandbox and resolves each
//! caller exactly once: from the matching sandbox response, or from the
//! expiry timer, whichever takes the pending entry first.

use parking_lot::RwLock;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use tether_ipc::{SandboxRequest, SandboxResponse};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ExecutionError;
use crate::pending::{PendingEvaluation, PendingTable};
use crate::sandbox::{SandboxHost, SandboxPort};

/// Default expiry window of a relayed evaluation
pub const DEFAULT_EVAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Broker between evaluation callers and one sandbox
pub struct EvalBroker {
    pending: Arc<PendingTable>,
    sandbox: RwLock<Option<SandboxPort>>,
    eval_timeout: Duration,
}

impl Default for EvalBroker {
    fn default() -> Self {
        Self::new(DEFAULT_EVAL_TIMEOUT)
    }
}

impl EvalBroker {
    pub fn new(eval_timeout: Duration) -> Self {
        Self {
            pending: Arc::new(PendingTable::new()),
            sandbox: RwLock::new(None),
            eval_timeout,
        }
    }

    /// Register the sandbox, replacing any earlier one
    pub fn register_sandbox(&self, port: SandboxPort) {
        if self.sandbox.write().replace(port).is_some() {
            info!("Replaced registered sandbox");
        } else {
            info!("Sandbox registered");
        }
    }

    pub fn eval_timeout(&self) -> Duration {
        self.eval_timeout
    }

    /// Number of evaluations still awaiting a response or expiry
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Evaluate `expression` in the sandbox with `bindings` visible by name.
    pub async fn evaluate(
        &self,
        expression: &str,
        bindings: Map<String, JsonValue>,
    ) -> Result<JsonValue, ExecutionError> {
        let port = self
            .sandbox
            .read()
            .clone()
            .ok_or(ExecutionError::NoSandbox)?;

        let id = Uuid::new_v4();
        let request = serde_json::to_value(SandboxRequest::Eval {
            id,
            expression: expression.to_string(),
            bindings,
        })
        .map_err(|e| ExecutionError::InvalidMessage(e.to_string()))?;

        let (responder, outcome) = oneshot::channel();
        self.pending
            .insert(PendingEvaluation::new(id, self.eval_timeout, responder));

        let expiry = self.spawn_expiry(id);
        self.pending.arm(&id, expiry.abort_handle());

        debug!(%id, "Relaying evaluation to sandbox");
        if let Err(err) = port.post(request) {
            if let Some(entry) = self.pending.take_if_present(&id) {
                entry.complete(Err(err.clone()));
            }
            return Err(err);
        }

        outcome.await.unwrap_or_else(|_| {
            Err(ExecutionError::SandboxUnavailable(
                "evaluation abandoned before it resolved".to_string(),
            ))
        })
    }

    fn spawn_expiry(&self, id: Uuid) -> JoinHandle<()> {
        let pending = self.pending.clone();
        let timeout = self.eval_timeout;

        tokio::spawn(async move {
            sleep(timeout).await;
            if let Some(entry) = pending.take_if_present(&id) {
                warn!(%id, "Evaluation timed out after {:?}", timeout);
                entry.expire(Err(ExecutionError::Timeout(timeout)));
            }
        })
    }

    /// Process one message posted back by the sandbox.
    ///
    /// Returns `Ok(true)` when it resolved a caller and `Ok(false)` for
    /// orphans whose entry was already consumed.
    pub fn handle_sandbox_message(&self, message: JsonValue) -> Result<bool, ExecutionError> {
        let response: SandboxResponse = serde_json::from_value(message)
            .map_err(|e| ExecutionError::InvalidMessage(e.to_string()))?;

        let SandboxResponse::EvalResult(result) = response;
        let id = result.id.ok_or(ExecutionError::MissingCorrelationId)?;

        let Some(entry) = self.pending.take_if_present(&id) else {
            debug!(%id, "Discarding orphan sandbox response");
            return Ok(false);
        };

        let outcome = result.into_outcome().map_err(ExecutionError::from);
        if !entry.complete(outcome) {
            debug!(%id, "Caller stopped waiting before the result arrived");
        }
        Ok(true)
    }

    /// Drain sandbox responses until the sandbox closes its side
    pub fn listen(self: &Arc<Self>, mut responses: mpsc::UnboundedReceiver<JsonValue>) -> JoinHandle<()> {
        let broker = Arc::clone(self);

        tokio::spawn(async move {
            while let Some(message) = responses.recv().await {
                if let Err(e) = broker.handle_sandbox_message(message) {
                    warn!("Rejected sandbox message: {}", e);
                }
            }
            debug!("Sandbox response channel closed");
        })
    }

    /// Register `host` and start listening to its responses
    pub fn attach(self: &Arc<Self>, host: &mut SandboxHost) -> Result<JoinHandle<()>, ExecutionError> {
        let responses = host.take_responses().ok_or_else(|| {
            ExecutionError::SandboxUnavailable("sandbox responses are already attached".to_string())
        })?;

        self.register_sandbox(host.port());
        Ok(self.listen(responses))
    }
}
