//! Boa-backed evaluator

use boa_engine::{property::Attribute, Context as BoaContext, JsString, Source};
use serde_json::{Map, Value as JsonValue};
use tether_ipc::EvalFailure;
use tracing::{debug, trace};

use crate::conversion::{json_to_js, Stringify};
use crate::error_handling::{capture_error, validate_binding_name};
use crate::Evaluator;

/// Engine limits applied to every evaluation context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluatorLimits {
    /// Maximum iterations of any single loop
    pub loop_iteration_limit: Option<u64>,
    /// Maximum call depth
    pub recursion_limit: Option<usize>,
}

/// Evaluates expressions in a fresh Boa context per request
#[derive(Debug, Clone, Default)]
pub struct BoaEvaluator {
    limits: EvaluatorLimits,
}

impl BoaEvaluator {
    pub fn new(limits: EvaluatorLimits) -> Self {
        Self { limits }
    }

    fn fresh_context(&self) -> BoaContext {
        let mut context = BoaContext::default();

        let limits = context.runtime_limits_mut();
        if let Some(iterations) = self.limits.loop_iteration_limit {
            limits.set_loop_iteration_limit(iterations);
        }
        if let Some(depth) = self.limits.recursion_limit {
            limits.set_recursion_limit(depth);
        }

        context
    }
}

impl Evaluator for BoaEvaluator {
    fn run(
        &mut self,
        expression: &str,
        bindings: &Map<String, JsonValue>,
    ) -> Result<JsonValue, EvalFailure> {
        let mut context = self.fresh_context();
        let stringify = Stringify::capture(&mut context)?;

        for (name, value) in bindings {
            validate_binding_name(name)?;
            let value = json_to_js(&mut context, value)?;
            context
                .register_global_property(JsString::from(name.as_str()), value, Attribute::all())
                .map_err(|e| capture_error(e, &mut context))?;
        }

        trace!("Evaluating expression with {} bindings", bindings.len());
        // A script's completion value is its last evaluated expression
        let result = context
            .eval(Source::from_bytes(expression))
            .map_err(|e| capture_error(e, &mut context))?;

        let json = stringify.to_json(&mut context, result)?;
        debug!("Expression evaluated");
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(expression: &str, bindings: JsonValue) -> Result<JsonValue, EvalFailure> {
        let bindings = bindings.as_object().cloned().unwrap_or_default();
        BoaEvaluator::default().run(expression, &bindings)
    }

    #[test]
    fn test_simple_expression() {
        assert_eq!(eval("1+1", json!({})).unwrap(), json!(2));
    }

    #[test]
    fn test_bindings_visible_by_name() {
        assert_eq!(eval("x*2", json!({"x": 5})).unwrap(), json!(10));
        assert_eq!(
            eval("user.name + '!'", json!({"user": {"name": "ada"}})).unwrap(),
            json!("ada!")
        );
    }

    #[test]
    fn test_multi_statement_returns_last_value() {
        let script = "var total = 0;\nfor (var i = 0; i < items.length; i++) { total += items[i]; }\ntotal";
        assert_eq!(eval(script, json!({"items": [1, 2, 3]})).unwrap(), json!(6));
    }

    #[test]
    fn test_thrown_error_is_captured() {
        let failure = eval("throw new Error('boom')", json!({})).unwrap_err();
        assert_eq!(failure.name, "Error");
        assert_eq!(failure.message, "boom");
    }

    #[test]
    fn test_syntax_error_is_captured() {
        let failure = eval("1 +", json!({})).unwrap_err();
        assert_eq!(failure.name, "SyntaxError");
    }

    #[test]
    fn test_invalid_binding_name() {
        let failure = eval("1", json!({"not-valid": 1})).unwrap_err();
        assert_eq!(failure.name, "SyntaxError");
        assert!(failure.message.contains("not-valid"));
    }

    #[test]
    fn test_contexts_do_not_leak_between_runs() {
        let mut evaluator = BoaEvaluator::default();
        let empty = Map::new();

        evaluator.run("var leaked = 42; leaked", &empty).unwrap();
        let failure = evaluator.run("leaked", &empty).unwrap_err();
        assert_eq!(failure.name, "ReferenceError");
    }

    #[test]
    fn test_loop_limit_stops_runaway_script() {
        let mut evaluator = BoaEvaluator::new(EvaluatorLimits {
            loop_iteration_limit: Some(1_000),
            recursion_limit: None,
        });

        assert!(evaluator.run("while (true) {}", &Map::new()).is_err());
    }

    #[test]
    fn test_undefined_result_is_null() {
        assert_eq!(eval("var y = 1;", json!({})).unwrap(), JsonValue::Null);
    }
}
