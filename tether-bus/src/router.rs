//! Inbound message routing
//!
//! Dispatches delivered messages by `type` and applies the privileged sender
//! guard to handlers that must not answer ordinary page content.

use async_trait::async_trait;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;
use tether_execution::EvalBroker;
use tether_ipc::{kinds, Endpoint, Message, PrivilegedSenderGuard, SenderIdentity};
use tracing::{debug, info, warn};

/// Error text returned to senders the guard rejects
pub const UNAUTHORIZED_SENDER: &str = "unauthorized sender";

/// A handler for one message type
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Build the response for `message`. Handlers report logical failures
    /// inside the response, typically as `{success: false, error}`.
    async fn handle(&self, message: &Message, sender: &SenderIdentity) -> JsonValue;
}

/// Build the conventional failure response
pub fn failure_response(error: impl Into<String>) -> JsonValue {
    json!({ "success": false, "error": error.into() })
}

struct Route {
    handler: Arc<dyn MessageHandler>,
    privileged: bool,
}

/// Type-keyed dispatch table
pub struct MessageRouter {
    routes: HashMap<String, Route>,
    guard: PrivilegedSenderGuard,
}

impl MessageRouter {
    pub fn new(guard: PrivilegedSenderGuard) -> Self {
        Self {
            routes: HashMap::new(),
            guard,
        }
    }

    /// Register a handler any sender may reach
    pub fn register(&mut self, kind: impl Into<String>, handler: Arc<dyn MessageHandler>) -> &mut Self {
        self.insert(kind.into(), handler, false)
    }

    /// Register a handler only privileged senders may reach
    pub fn register_privileged(
        &mut self,
        kind: impl Into<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> &mut Self {
        self.insert(kind.into(), handler, true)
    }

    fn insert(&mut self, kind: String, handler: Arc<dyn MessageHandler>, privileged: bool) -> &mut Self {
        if self.routes.insert(kind.clone(), Route { handler, privileged }).is_some() {
            warn!("Replaced handler for {}", kind);
        }
        self
    }

    pub fn handles(&self, kind: &str) -> bool {
        self.routes.contains_key(kind)
    }

    pub fn guard(&self) -> &PrivilegedSenderGuard {
        &self.guard
    }

    /// Route one message and return the response for its sender
    pub async fn dispatch(&self, message: &Message, sender: &SenderIdentity) -> JsonValue {
        let Some(route) = self.routes.get(&message.kind) else {
            debug!("No handler for message type {}", message.kind);
            return failure_response(format!("unknown message type: {}", message.kind));
        };

        if route.privileged && !self.guard.allows(Some(sender)) {
            warn!(
                kind = %message.kind,
                url = sender.url.as_deref().unwrap_or("-"),
                "Rejected message from unprivileged sender"
            );
            return failure_response(UNAUTHORIZED_SENDER);
        }

        route.handler.handle(message, sender).await
    }

    /// Answer everything delivered to `endpoint` until it closes.
    ///
    /// Each message is handled on its own task so a slow handler does not
    /// hold up the others.
    pub async fn serve(self: Arc<Self>, mut endpoint: Endpoint) {
        info!("Message router listening");

        while let Some(incoming) = endpoint.recv().await {
            let router = Arc::clone(&self);
            tokio::spawn(async move {
                let (message, sender, responder) = incoming.into_parts();
                let response = router.dispatch(&message, &sender).await;
                if !responder.respond(response) {
                    debug!("Sender of {} stopped waiting", message.kind);
                }
            });
        }

        info!("Message router endpoint closed");
    }
}

/// Serves `EVALUATE_EXPRESSION {expression, bindings}` through the broker
pub struct EvaluateHandler {
    broker: Arc<EvalBroker>,
}

impl EvaluateHandler {
    pub fn new(broker: Arc<EvalBroker>) -> Self {
        Self { broker }
    }

    pub fn kind() -> &'static str {
        kinds::EVALUATE_EXPRESSION
    }
}

#[async_trait]
impl MessageHandler for EvaluateHandler {
    async fn handle(&self, message: &Message, _sender: &SenderIdentity) -> JsonValue {
        let Some(expression) = message.get_str("expression") else {
            return failure_response("missing expression");
        };

        let bindings = match message.get("bindings") {
            None | Some(JsonValue::Null) => Map::new(),
            Some(JsonValue::Object(bindings)) => bindings.clone(),
            Some(_) => return failure_response("bindings must be an object"),
        };

        match self.broker.evaluate(expression, bindings).await {
            Ok(result) => json!({ "success": true, "result": result }),
            Err(err) => json!({
                "success": false,
                "error": err.to_string(),
                "code": err.code(),
            }),
        }
    }
}
