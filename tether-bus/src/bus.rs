//! Messaging bus
//!
//! Turns the single-shot transport into deliveries with bounded retries,
//! exponential backoff and an optional acknowledgment race. The bus keeps no
//! state between calls.

use serde_json::Value as JsonValue;
use std::time::Duration;
use tether_ipc::{Channel, ContextId, FailureReason, Message, Transport, TransportFailure};
use tether_resilience::{RetryExecutor, RetryPolicy};
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::error::BusError;

/// Fields any one of which, when boolean, acknowledges a response
pub const ACK_FIELDS: [&str; 3] = ["ack", "success", "ok"];

/// Process-wide delivery defaults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
    /// `None` disables the acknowledgment timer
    pub ack_timeout: Option<Duration>,
    pub require_ack: bool,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(150),
            ack_timeout: Some(Duration::from_millis(3000)),
            require_ack: false,
        }
    }
}

impl DeliveryPolicy {
    /// Apply per-call overrides on top of these defaults
    pub fn merged(&self, options: &SendOptions) -> DeliveryPolicy {
        DeliveryPolicy {
            max_retries: options.max_retries.unwrap_or(self.max_retries),
            backoff_base: options.backoff_base.unwrap_or(self.backoff_base),
            ack_timeout: options.ack_timeout.unwrap_or(self.ack_timeout),
            require_ack: options.require_ack.unwrap_or(self.require_ack),
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.max_retries, self.backoff_base)
    }
}

/// Per-call overrides; unset fields fall back to the bus defaults
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    max_retries: Option<u32>,
    backoff_base: Option<Duration>,
    ack_timeout: Option<Option<Duration>>,
    require_ack: Option<bool>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = Some(base);
        self
    }

    pub fn ack_timeout(mut self, limit: Duration) -> Self {
        self.ack_timeout = Some(Some(limit));
        self
    }

    pub fn without_ack_timeout(mut self) -> Self {
        self.ack_timeout = Some(None);
        self
    }

    pub fn require_ack(mut self, require: bool) -> Self {
        self.require_ack = Some(require);
        self
    }

    /// A single attempt, for callers that run their own retry loop
    pub fn no_retry() -> Self {
        Self::default().max_retries(0)
    }
}

/// Whether `response` carries an acknowledgment marker.
///
/// Any boolean `ack`, `success` or `ok` field counts, `false` included; no
/// field takes precedence over another.
pub fn is_acknowledged(response: &JsonValue) -> bool {
    ACK_FIELDS
        .iter()
        .any(|field| response.get(*field).is_some_and(JsonValue::is_boolean))
}

/// Retrying bus over a `Transport`
#[derive(Debug, Clone)]
pub struct MessageBus<T> {
    transport: T,
    defaults: DeliveryPolicy,
}

impl<T: Transport> MessageBus<T> {
    pub fn new(transport: T) -> Self {
        Self::with_defaults(transport, DeliveryPolicy::default())
    }

    pub fn with_defaults(transport: T, defaults: DeliveryPolicy) -> Self {
        Self {
            transport,
            defaults,
        }
    }

    pub fn defaults(&self) -> &DeliveryPolicy {
        &self.defaults
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn send_to_privileged_surface(
        &self,
        message: &Message,
        options: SendOptions,
    ) -> Result<JsonValue, BusError> {
        self.send(Channel::PrivilegedSurface, message, options).await
    }

    pub async fn send_to_context(
        &self,
        context: ContextId,
        message: &Message,
        options: SendOptions,
    ) -> Result<JsonValue, BusError> {
        self.send(Channel::Context(context), message, options).await
    }

    /// Deliver `message`, retrying transient failures with backoff.
    ///
    /// Attempts never exceed `max_retries + 1`. A fatal failure ends the call
    /// after the attempt that produced it.
    pub async fn send(
        &self,
        channel: Channel,
        message: &Message,
        options: SendOptions,
    ) -> Result<JsonValue, BusError> {
        let policy = self.defaults.merged(&options);
        let executor = RetryExecutor::new(policy.retry_policy())
            .with_label(format!("{} to {}", message.kind, channel));

        let policy = &policy;
        executor
            .execute_with_context(move |attempt| {
                trace!(attempt, %channel, kind = %message.kind, "Sending message");
                self.attempt(channel, message, policy)
            })
            .await
            .map_err(|err| {
                let attempts = err.attempts();
                let failure = err.into_inner();
                debug!(%channel, attempts, "Delivery failed: {}", failure);
                BusError {
                    channel,
                    attempts,
                    failure,
                }
            })
    }

    async fn attempt(
        &self,
        channel: Channel,
        message: &Message,
        policy: &DeliveryPolicy,
    ) -> Result<JsonValue, TransportFailure> {
        let send = self.transport.send(channel, message);

        let response = match policy.ack_timeout.filter(|_| policy.require_ack) {
            Some(limit) => timeout(limit, send).await.map_err(|_| {
                TransportFailure::new(FailureReason::AckTimeout, format!("ack timeout on {}", channel))
            })??,
            None => send.await?,
        };

        if policy.require_ack && !is_acknowledged(&response) {
            return Err(TransportFailure::new(FailureReason::NoAck, "no ack received"));
        }

        Ok(response)
    }
}
