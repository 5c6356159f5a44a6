//! Preference lookup

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use tether_ipc::{kinds, Message, SenderIdentity, Transport};

use crate::bus::{MessageBus, SendOptions};
use crate::error::PreferenceError;
use crate::router::{failure_response, MessageHandler};

/// Reads preferences from the privileged surface over the bus
#[derive(Debug, Clone)]
pub struct PreferenceClient<T> {
    bus: MessageBus<T>,
}

impl<T: Transport> PreferenceClient<T> {
    pub fn new(bus: MessageBus<T>) -> Self {
        Self { bus }
    }

    /// Value stored under `key`; `null` when unset
    pub async fn get(&self, key: &str) -> Result<JsonValue, PreferenceError> {
        let message = Message::new(kinds::GET_PREFERENCE).with("key", key);
        let response = self
            .bus
            .send_to_privileged_surface(&message, SendOptions::new())
            .await?;

        match response.get("success").and_then(JsonValue::as_bool) {
            Some(true) => Ok(response.get("value").cloned().unwrap_or(JsonValue::Null)),
            Some(false) => Err(PreferenceError::Rejected {
                key: key.to_string(),
                message: response
                    .get("error")
                    .and_then(JsonValue::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            }),
            None => Err(PreferenceError::MalformedResponse(response.to_string())),
        }
    }
}

/// In-memory store answering `GET_PREFERENCE`
#[derive(Debug, Default)]
pub struct PreferenceStore {
    values: RwLock<HashMap<String, JsonValue>>,
}

impl PreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: JsonValue) {
        self.values.write().insert(key.into(), value);
    }
}

#[async_trait]
impl MessageHandler for PreferenceStore {
    async fn handle(&self, message: &Message, _sender: &SenderIdentity) -> JsonValue {
        let Some(key) = message.get_str("key") else {
            return failure_response("missing key");
        };

        let value = self.values.read().get(key).cloned().unwrap_or(JsonValue::Null);
        json!({ "success": true, "value": value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::MessageRouter;
    use std::sync::Arc;
    use tether_ipc::{ChannelTransport, PrivilegedSenderGuard};

    struct Broken;

    #[async_trait]
    impl MessageHandler for Broken {
        async fn handle(&self, _message: &Message, _sender: &SenderIdentity) -> JsonValue {
            json!({ "value": 1 })
        }
    }

    fn serve(handler: Arc<dyn MessageHandler>) -> PreferenceClient<ChannelTransport> {
        let transport = ChannelTransport::new(SenderIdentity::extension("X"));
        let mut router = MessageRouter::new(PrivilegedSenderGuard::for_extension("X"));
        router.register(kinds::GET_PREFERENCE, handler);
        tokio::spawn(Arc::new(router).serve(transport.open_privileged_endpoint()));
        PreferenceClient::new(MessageBus::new(transport))
    }

    #[tokio::test]
    async fn test_get_stored_and_missing_values() {
        let store = Arc::new(PreferenceStore::new());
        store.set("theme", json!("dark"));
        let client = serve(store);

        assert_eq!(client.get("theme").await.unwrap(), json!("dark"));
        assert_eq!(client.get("unset").await.unwrap(), JsonValue::Null);
    }

    #[tokio::test]
    async fn test_response_without_success_is_malformed() {
        let client = serve(Arc::new(Broken));

        assert!(matches!(
            client.get("theme").await,
            Err(PreferenceError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_lookup() {
        let transport = ChannelTransport::new(SenderIdentity::extension("X"));
        let mut router = MessageRouter::new(PrivilegedSenderGuard::for_extension("X"));
        router.register_privileged(kinds::GET_PREFERENCE, Arc::new(PreferenceStore::new()));
        tokio::spawn(Arc::new(router).serve(transport.open_privileged_endpoint()));

        // a page-hosted sender on the same runtime
        let page = transport.as_sender(
            SenderIdentity::extension("X")
                .with_url("https://evil.example/")
                .in_tab(),
        );
        let client = PreferenceClient::new(MessageBus::new(page));

        match client.get("theme").await {
            Err(PreferenceError::Rejected { key, message }) => {
                assert_eq!(key, "theme");
                assert_eq!(message, "unauthorized sender");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
