//! Dialog argument lookup
//!
//! A dialog asks the privileged surface for the arguments it was opened
//! with. The registry may not have them yet, so the client polls at a fixed
//! interval; the bus itself is not asked to retry.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tether_ipc::{kinds, Message, SenderIdentity, Transport};
use tether_resilience::{RetryError, RetryExecutor, RetryPolicy, Retryable};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::bus::{MessageBus, SendOptions};
use crate::error::{BusError, DialogError};
use crate::router::{failure_response, MessageHandler};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(6);

/// Outcome of one poll that did not yield arguments
#[derive(Debug)]
enum Poll {
    Pending(String),
    Failed(BusError),
}

impl fmt::Display for Poll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Poll::Pending(reason) => write!(f, "{}", reason),
            Poll::Failed(err) => write!(f, "{}", err),
        }
    }
}

impl Retryable for Poll {
    fn is_retryable(&self) -> bool {
        match self {
            Poll::Pending(_) => true,
            Poll::Failed(err) => err.is_transient(),
        }
    }
}

/// Fetches dialog arguments from the privileged surface
#[derive(Debug, Clone)]
pub struct DialogArgsClient<T> {
    bus: MessageBus<T>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl<T: Transport> DialogArgsClient<T> {
    pub fn new(bus: MessageBus<T>) -> Self {
        Self::with_polling(bus, DEFAULT_POLL_INTERVAL, DEFAULT_MAX_WAIT)
    }

    pub fn with_polling(bus: MessageBus<T>, poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            bus,
            poll_interval,
            max_wait,
        }
    }

    /// Poll until the registry answers `{success: true, args}` or the wait
    /// window is spent
    ///
    /// Each poll is bounded by the poll interval and the whole fetch by
    /// `max_wait`, so a receiver that never answers cannot stall the caller.
    pub async fn fetch(&self, dialog_id: &str) -> Result<JsonValue, DialogError> {
        let message = Message::new(kinds::GET_DIALOG_ARGS).with("dialogId", dialog_id);
        let executor = RetryExecutor::new(RetryPolicy::fixed_window(self.poll_interval, self.max_wait))
            .with_label(format!("dialog args for {}", dialog_id));

        let message = &message;
        let polling = executor.execute(move || self.poll_once(message));
        let Ok(outcome) = timeout(self.max_wait, polling).await else {
            warn!("Gave up on dialog {} after {:?}", dialog_id, self.max_wait);
            return Err(DialogError::NotReady {
                dialog_id: dialog_id.to_string(),
                waited_ms: self.max_wait.as_millis(),
                last_error: format!("no answer within {:?}", self.max_wait),
            });
        };

        outcome.map_err(|err| match err {
            RetryError::NonRetryable {
                error: Poll::Failed(bus),
                ..
            } => DialogError::Bus(bus),
            other => DialogError::NotReady {
                dialog_id: dialog_id.to_string(),
                waited_ms: self.max_wait.as_millis(),
                last_error: other.into_inner().to_string(),
            },
        })
    }

    async fn poll_once(&self, message: &Message) -> Result<JsonValue, Poll> {
        let response = self
            .bus
            .send_to_privileged_surface(
                message,
                SendOptions::no_retry()
                    .require_ack(true)
                    .ack_timeout(self.poll_interval),
            )
            .await
            .map_err(Poll::Failed)?;

        if response.get("success").and_then(JsonValue::as_bool) == Some(true) {
            return Ok(response.get("args").cloned().unwrap_or(JsonValue::Null));
        }

        let reason = response
            .get("error")
            .and_then(JsonValue::as_str)
            .unwrap_or("dialog arguments not ready");
        Err(Poll::Pending(reason.to_string()))
    }
}

/// In-memory registry answering `GET_DIALOG_ARGS`
#[derive(Debug, Default)]
pub struct DialogArgsRegistry {
    args: Mutex<HashMap<String, JsonValue>>,
}

impl DialogArgsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, dialog_id: impl Into<String>, args: JsonValue) {
        self.args.lock().insert(dialog_id.into(), args);
    }

    pub fn remove(&self, dialog_id: &str) -> Option<JsonValue> {
        self.args.lock().remove(dialog_id)
    }
}

#[async_trait]
impl MessageHandler for DialogArgsRegistry {
    async fn handle(&self, message: &Message, _sender: &SenderIdentity) -> JsonValue {
        let Some(dialog_id) = message.get_str("dialogId") else {
            return failure_response("missing dialogId");
        };

        match self.args.lock().get(dialog_id) {
            Some(args) => json!({ "success": true, "args": args }),
            None => {
                debug!("No arguments registered for dialog {}", dialog_id);
                failure_response(format!("no arguments registered for dialog {}", dialog_id))
            }
        }
    }
}
