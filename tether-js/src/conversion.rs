//! JavaScript data conversion utilities

use boa_engine::{Context as BoaContext, JsValue, Source};
use serde_json::Value as JsonValue;
use tracing::trace;

use crate::JsExecutionError;

/// Convert a JSON binding into a JavaScript value
pub fn json_to_js(context: &mut BoaContext, value: &JsonValue) -> Result<JsValue, JsExecutionError> {
    trace!("Converting binding to JavaScript value");
    JsValue::from_json(value, context).map_err(|e| JsExecutionError::InputError(e.to_string()))
}

/// Captured `JSON.stringify`, taken before untrusted code runs so that a
/// program overwriting the `JSON` global cannot change how its result is read.
pub struct Stringify(JsValue);

impl Stringify {
    pub fn capture(context: &mut BoaContext) -> Result<Self, JsExecutionError> {
        let stringify = context
            .eval(Source::from_bytes("JSON.stringify"))
            .map_err(|e| JsExecutionError::OutputError(format!("JSON.stringify unavailable: {}", e)))?;

        if !stringify.is_callable() {
            return Err(JsExecutionError::OutputError(
                "JSON.stringify is not callable".to_string(),
            ));
        }

        Ok(Self(stringify))
    }

    /// Convert an evaluation result back to JSON.
    ///
    /// `undefined` reads as null; functions and symbols cannot cross the
    /// sandbox boundary.
    pub fn to_json(&self, context: &mut BoaContext, result: JsValue) -> Result<JsonValue, JsExecutionError> {
        if result.is_undefined() {
            return Ok(JsonValue::Null);
        }

        let callable = self
            .0
            .as_callable()
            .ok_or_else(|| JsExecutionError::OutputError("JSON.stringify is not callable".to_string()))?;

        let encoded = callable
            .call(&JsValue::undefined(), &[result.clone()], context)
            .map_err(|e| JsExecutionError::OutputError(e.to_string()))?;

        let Some(text) = encoded.as_string() else {
            let kind = if result.is_callable() { "function" } else { "value" };
            return Err(JsExecutionError::NotCloneable(format!("{} could not be cloned", kind)));
        };

        serde_json::from_str(&text.to_std_string_escaped())
            .map_err(|e| JsExecutionError::OutputError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_binding_round_trip_through_engine() {
        let mut context = BoaContext::default();
        let stringify = Stringify::capture(&mut context).unwrap();

        let input = json!({"name": "it's \"quoted\"", "items": [1, 2, 3], "nested": {"ok": true}});
        let value = json_to_js(&mut context, &input).unwrap();

        assert_eq!(stringify.to_json(&mut context, value).unwrap(), input);
    }

    #[test]
    fn test_undefined_reads_as_null() {
        let mut context = BoaContext::default();
        let stringify = Stringify::capture(&mut context).unwrap();

        let value = stringify.to_json(&mut context, JsValue::undefined()).unwrap();
        assert_eq!(value, JsonValue::Null);
    }

    #[test]
    fn test_function_is_not_cloneable() {
        let mut context = BoaContext::default();
        let stringify = Stringify::capture(&mut context).unwrap();

        let function = context
            .eval(Source::from_bytes("(function () { return 1; })"))
            .unwrap();

        let err = stringify.to_json(&mut context, function).unwrap_err();
        assert!(matches!(err, JsExecutionError::NotCloneable(_)));
    }
}
