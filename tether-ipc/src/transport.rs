//! Transport abstraction and the in-process channel transport

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use crate::error::{TransportFailure, NATIVE_NO_RECEIVER, NATIVE_PORT_CLOSED};
use crate::protocol::Message;
use crate::sender::SenderIdentity;

/// Identifier of a tab or frame context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(pub u32);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a message is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Broadcast to privileged extension surfaces
    PrivilegedSurface,
    /// Directed to one tab or frame context
    Context(ContextId),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::PrivilegedSurface => write!(f, "runtime"),
            Channel::Context(id) => write!(f, "tab {}", id),
        }
    }
}

/// Single-shot delivery primitive
///
/// One call is one delivery attempt. Implementations report failures as
/// classified `TransportFailure`s and may never complete at all.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, channel: Channel, message: &Message) -> Result<JsonValue, TransportFailure>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, channel: Channel, message: &Message) -> Result<JsonValue, TransportFailure> {
        (**self).send(channel, message).await
    }
}

/// One-shot reply handle attached to a delivered message
#[derive(Debug)]
pub struct Responder(oneshot::Sender<JsonValue>);

impl Responder {
    /// Answer the sender. Returns false if the sender stopped waiting.
    pub fn respond(self, response: JsonValue) -> bool {
        self.0.send(response).is_ok()
    }
}

/// A message delivered to an endpoint
#[derive(Debug)]
pub struct IncomingMessage {
    pub message: Message,
    pub sender: SenderIdentity,
    responder: Responder,
}

impl IncomingMessage {
    pub fn respond(self, response: JsonValue) -> bool {
        self.responder.respond(response)
    }

    pub fn into_parts(self) -> (Message, SenderIdentity, Responder) {
        (self.message, self.sender, self.responder)
    }
}

/// Receiving side of a channel
#[derive(Debug)]
pub struct Endpoint {
    rx: mpsc::UnboundedReceiver<IncomingMessage>,
}

impl Endpoint {
    pub async fn recv(&mut self) -> Option<IncomingMessage> {
        self.rx.recv().await
    }
}

#[derive(Default)]
struct Registry {
    privileged: Option<mpsc::UnboundedSender<IncomingMessage>>,
    contexts: HashMap<ContextId, mpsc::UnboundedSender<IncomingMessage>>,
}

/// In-process model of the extension messaging runtime
///
/// Clones share one registry of endpoints; each clone stamps its own
/// `SenderIdentity` on outgoing messages. Failures are reported with the
/// host runtime's native error text and classified from it.
#[derive(Clone)]
pub struct ChannelTransport {
    registry: Arc<RwLock<Registry>>,
    sender: SenderIdentity,
}

impl ChannelTransport {
    pub fn new(sender: SenderIdentity) -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            sender,
        }
    }

    /// A transport on the same registry that sends as `sender`
    pub fn as_sender(&self, sender: SenderIdentity) -> Self {
        Self {
            registry: self.registry.clone(),
            sender,
        }
    }

    /// Start listening on the privileged surface channel, replacing any
    /// earlier listener.
    pub fn open_privileged_endpoint(&self) -> Endpoint {
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.write().privileged = Some(tx);
        Endpoint { rx }
    }

    pub fn open_context_endpoint(&self, id: ContextId) -> Endpoint {
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.write().contexts.insert(id, tx);
        Endpoint { rx }
    }

    pub fn close_context(&self, id: ContextId) {
        self.registry.write().contexts.remove(&id);
    }

    fn route(&self, channel: Channel) -> Option<mpsc::UnboundedSender<IncomingMessage>> {
        let registry = self.registry.read();
        match channel {
            Channel::PrivilegedSurface => registry.privileged.clone(),
            Channel::Context(id) => registry.contexts.get(&id).cloned(),
        }
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, channel: Channel, message: &Message) -> Result<JsonValue, TransportFailure> {
        let route = self
            .route(channel)
            .ok_or_else(|| TransportFailure::from_native(NATIVE_NO_RECEIVER))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let incoming = IncomingMessage {
            message: message.clone(),
            sender: self.sender.clone(),
            responder: Responder(reply_tx),
        };

        trace!("Delivering {} to {}", message.kind, channel);
        route.send(incoming).map_err(|_| {
            debug!("Endpoint for {} is closed", channel);
            TransportFailure::from_native(NATIVE_NO_RECEIVER)
        })?;

        reply_rx
            .await
            .map_err(|_| TransportFailure::from_native(NATIVE_PORT_CLOSED))
    }
}
