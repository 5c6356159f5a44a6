//! Wire protocol definitions and message types
//!
//! The `type`, `requestKind` and `responseKind` tags are understood by every
//! peer; renaming any of them is a breaking protocol change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::error::IpcError;

/// Message type tags understood by the built-in handlers
pub mod kinds {
    pub const GET_DIALOG_ARGS: &str = "GET_DIALOG_ARGS";
    pub const GET_PREFERENCE: &str = "GET_PREFERENCE";
    pub const EVALUATE_EXPRESSION: &str = "EVALUATE_EXPRESSION";
}

/// A tagged record `{ type, ...payload }` exchanged between surfaces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(flatten)]
    pub payload: Map<String, JsonValue>,
}

impl Message {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Map::new(),
        }
    }

    /// Add a payload field
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.payload.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(JsonValue::as_str)
    }

    pub fn to_json(&self) -> Result<JsonValue, IpcError> {
        serde_json::to_value(self).map_err(IpcError::from)
    }

    pub fn from_json(value: JsonValue) -> Result<Self, IpcError> {
        serde_json::from_value(value).map_err(IpcError::from)
    }
}

/// Requests relayed from the broker into the sandbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "requestKind", rename_all = "snake_case")]
pub enum SandboxRequest {
    /// Evaluate `expression` with `bindings` visible by name
    Eval {
        id: Uuid,
        expression: String,
        #[serde(default)]
        bindings: Map<String, JsonValue>,
    },
}

/// Responses posted back by the sandbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "responseKind", rename_all = "snake_case")]
pub enum SandboxResponse {
    EvalResult(EvalResult),
}

/// Outcome of one evaluation, echoed with its correlation id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalResult {
    /// Absent only in malformed responses
    #[serde(default)]
    pub id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EvalFailure>,
}

impl EvalResult {
    pub fn success(id: Uuid, result: JsonValue) -> Self {
        Self {
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Uuid, error: EvalFailure) -> Self {
        Self {
            id: Some(id),
            result: None,
            error: Some(error),
        }
    }

    /// An error payload wins over a result; a missing result reads as null.
    pub fn into_outcome(self) -> Result<JsonValue, EvalFailure> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(JsonValue::Null)),
        }
    }
}

/// An exception captured inside the sandbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalFailure {
    pub name: String,
    pub message: String,
}

impl EvalFailure {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for EvalFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_flattens_payload() {
        let message = Message::new(kinds::GET_PREFERENCE).with("key", "theme");

        let json = message.to_json().unwrap();
        assert_eq!(json, json!({"type": "GET_PREFERENCE", "key": "theme"}));

        let parsed = Message::from_json(json).unwrap();
        assert_eq!(parsed.get_str("key"), Some("theme"));
    }

    #[test]
    fn test_message_without_type_is_rejected() {
        let err = Message::from_json(json!({"key": "theme"})).unwrap_err();
        assert!(matches!(err, IpcError::DeserializationError(_)));
    }

    #[test]
    fn test_eval_request_wire_shape() {
        let id = Uuid::new_v4();
        let mut bindings = Map::new();
        bindings.insert("x".to_string(), json!(5));

        let request = SandboxRequest::Eval {
            id,
            expression: "x*2".to_string(),
            bindings,
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "requestKind": "eval",
                "id": id.to_string(),
                "expression": "x*2",
                "bindings": {"x": 5},
            })
        );
    }

    #[test]
    fn test_eval_response_wire_shape() {
        let id = Uuid::new_v4();
        let response = SandboxResponse::EvalResult(EvalResult::failure(
            id,
            EvalFailure::new("Error", "boom"),
        ));

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "responseKind": "eval_result",
                "id": id.to_string(),
                "error": {"name": "Error", "message": "boom"},
            })
        );
    }

    #[test]
    fn test_null_result_is_a_success() {
        let id = Uuid::new_v4();
        let parsed: SandboxResponse = serde_json::from_value(json!({
            "responseKind": "eval_result",
            "id": id.to_string(),
            "result": null,
        }))
        .unwrap();

        let SandboxResponse::EvalResult(result) = parsed;
        assert_eq!(result.into_outcome(), Ok(JsonValue::Null));
    }

    #[test]
    fn test_response_without_id_parses() {
        let parsed: SandboxResponse = serde_json::from_value(json!({
            "responseKind": "eval_result",
            "result": 1,
        }))
        .unwrap();

        let SandboxResponse::EvalResult(result) = parsed;
        assert!(result.id.is_none());
    }
}
