//! Wires the messaging stack together in one process

use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use tether_bus::{DeliveryPolicy, EvaluateHandler, MessageBus, MessageRouter, SendOptions};
use tether_config::{GuardConfig, MessagingConfig, SandboxConfig, TetherConfig};
use tether_execution::{EvalBroker, SandboxHost};
use tether_ipc::{kinds, ChannelTransport, Message, PrivilegedSenderGuard, SenderIdentity};
use tether_js::EvaluatorLimits;
use tracing::{debug, info};

pub fn delivery_policy(config: &MessagingConfig) -> DeliveryPolicy {
    DeliveryPolicy {
        max_retries: config.max_retries,
        backoff_base: config.backoff_base,
        ack_timeout: config.ack_timeout,
        require_ack: config.require_ack,
    }
}

pub fn evaluator_limits(config: &SandboxConfig) -> EvaluatorLimits {
    EvaluatorLimits {
        loop_iteration_limit: config.loop_iteration_limit,
        recursion_limit: config.recursion_limit,
    }
}

pub fn sender_guard(config: &GuardConfig) -> PrivilegedSenderGuard {
    PrivilegedSenderGuard::new(config.extension_id.clone(), config.resolved_origin_prefix())
}

/// Parse `name=json`; a value that is not JSON is taken as a string
pub fn parse_binding(raw: &str) -> Result<(String, JsonValue)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Binding '{}' is not of the form NAME=JSON", raw))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("Binding '{}' has an empty name", raw));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| JsonValue::String(value.to_string()));
    Ok((name.to_string(), value))
}

pub fn parse_bindings(raw: &[String]) -> Result<Map<String, JsonValue>> {
    raw.iter().map(|binding| parse_binding(binding)).collect()
}

/// Options for evaluation requests
///
/// The broker bounds every evaluation with its own timeout. An ack timer
/// shorter than that would re-send a slow script and run it twice.
pub fn evaluation_send_options() -> SendOptions {
    SendOptions::new().without_ack_timeout()
}

/// A sandbox, broker, router and bus sharing one in-process transport
///
/// The privileged surface hosts the router; callers reach it through the bus
/// as an internal extension surface.
pub struct LocalRuntime {
    bus: MessageBus<ChannelTransport>,
    _host: SandboxHost,
}

impl LocalRuntime {
    pub fn start(config: &TetherConfig) -> Result<Self> {
        let mut host = SandboxHost::spawn_boa(evaluator_limits(&config.sandbox))
            .context("Failed to start sandbox")?;

        let broker = Arc::new(EvalBroker::new(config.sandbox.eval_timeout));
        broker.attach(&mut host).context("Failed to attach sandbox")?;

        let mut router = MessageRouter::new(sender_guard(&config.guard));
        router.register_privileged(kinds::EVALUATE_EXPRESSION, Arc::new(EvaluateHandler::new(broker)));

        let transport = ChannelTransport::new(SenderIdentity::extension(config.guard.extension_id.clone()));
        tokio::spawn(Arc::new(router).serve(transport.open_privileged_endpoint()));

        info!("Local runtime started");
        Ok(Self {
            bus: MessageBus::with_defaults(transport, delivery_policy(&config.messaging)),
            _host: host,
        })
    }

    /// Send an `EVALUATE_EXPRESSION` request and return the raw response
    pub async fn evaluate(&self, expression: &str, bindings: Map<String, JsonValue>) -> Result<JsonValue> {
        let message = Message::new(kinds::EVALUATE_EXPRESSION)
            .with("expression", expression)
            .with("bindings", JsonValue::Object(bindings));

        debug!("Sending evaluation request");
        let response = self
            .bus
            .send_to_privileged_surface(&message, evaluation_send_options())
            .await?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_parse_binding() {
        assert_eq!(parse_binding("x=5").unwrap(), ("x".to_string(), json!(5)));
        assert_eq!(
            parse_binding("user={\"name\":\"ada\"}").unwrap(),
            ("user".to_string(), json!({"name": "ada"}))
        );
        assert_eq!(parse_binding("name=ada").unwrap(), ("name".to_string(), json!("ada")));
        assert_eq!(parse_binding("eq=a=b").unwrap(), ("eq".to_string(), json!("a=b")));
        assert!(parse_binding("novalue").is_err());
        assert!(parse_binding("=1").is_err());
    }

    #[test]
    fn test_config_mapping() {
        let config = TetherConfig::default();

        let policy = delivery_policy(&config.messaging);
        assert_eq!(policy, DeliveryPolicy::default());

        let guard = sender_guard(&config.guard);
        assert_eq!(guard.origin_prefix(), "chrome-extension://tether/");
    }

    #[test]
    fn test_evaluation_requests_never_race_an_ack_timer() {
        let mut config = TetherConfig::default();
        config.messaging.require_ack = true;
        config.messaging.ack_timeout = Some(Duration::from_millis(50));

        let policy = delivery_policy(&config.messaging).merged(&evaluation_send_options());
        assert!(policy.require_ack);
        assert_eq!(policy.ack_timeout, None);
        assert_eq!(policy.max_retries, config.messaging.max_retries);
    }

    #[tokio::test]
    async fn test_slow_script_runs_once_with_short_ack_timeout() {
        let mut config = TetherConfig::default();
        config.messaging.require_ack = true;
        config.messaging.ack_timeout = Some(Duration::from_millis(1));
        let runtime = LocalRuntime::start(&config).unwrap();

        let script = r#"
            let total = 0;
            for (let i = 0; i < 200000; i++) { total += i; }
            total
        "#;
        let response = runtime.evaluate(script, Map::new()).await.unwrap();
        assert_eq!(response, json!({"success": true, "result": 19999900000_i64}));
    }

    #[tokio::test]
    async fn test_local_runtime_evaluates() {
        let runtime = LocalRuntime::start(&TetherConfig::default()).unwrap();
        let bindings = parse_bindings(&["x=5".to_string()]).unwrap();

        let response = runtime.evaluate("x*2", bindings).await.unwrap();
        assert_eq!(response, json!({"success": true, "result": 10}));

        let response = runtime.evaluate("throw new Error('boom')", Map::new()).await.unwrap();
        assert_eq!(response["success"], json!(false));
        assert_eq!(response["error"], json!("boom"));
    }
}
