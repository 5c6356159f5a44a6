//! Capturing JavaScript exceptions as structured failures

use boa_engine::{object::JsObject, Context as BoaContext, JsError, JsString};
use tether_ipc::EvalFailure;

use crate::JsExecutionError;

/// Convert a thrown JavaScript error into `{ name, message }`.
///
/// Engine-raised errors (`ReferenceError`, runtime limits) arrive native;
/// anything the program threw itself arrives as an opaque value, which may be
/// an error object or a bare primitive such as `throw "boom"`.
pub fn capture_error(error: JsError, context: &mut BoaContext) -> EvalFailure {
    if let Some(native) = error.as_native() {
        return EvalFailure::new(native.kind.to_string(), native.message());
    }

    let Some(thrown) = error.as_opaque() else {
        return EvalFailure::new("Error", error.to_string());
    };

    if let Some(object) = thrown.as_object() {
        let name = read_string_property(object, "name", context).unwrap_or_else(|| "Error".to_string());
        let message = read_string_property(object, "message", context).unwrap_or_default();
        return EvalFailure::new(name, message);
    }

    let message = thrown
        .to_string(context)
        .map(|s| s.to_std_string_escaped())
        .unwrap_or_else(|_| error.to_string());
    EvalFailure::new("Error", message)
}

fn read_string_property(object: &JsObject, key: &str, context: &mut BoaContext) -> Option<String> {
    let value = object.get(JsString::from(key), context).ok()?;
    if value.is_undefined() || value.is_null() {
        return None;
    }
    value.to_string(context).ok().map(|s| s.to_std_string_escaped())
}

/// Reject binding names that could not be declared as parameters
pub fn validate_binding_name(name: &str) -> Result<(), JsExecutionError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(JsExecutionError::InvalidBinding(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boa_engine::Source;

    fn failure_of(code: &str) -> EvalFailure {
        let mut context = BoaContext::default();
        let error = context.eval(Source::from_bytes(code)).unwrap_err();
        capture_error(error, &mut context)
    }

    #[test]
    fn test_thrown_error_object() {
        assert_eq!(failure_of("throw new Error('boom')"), EvalFailure::new("Error", "boom"));
    }

    #[test]
    fn test_thrown_type_error_keeps_name() {
        let failure = failure_of("throw new TypeError('bad type')");
        assert_eq!(failure.name, "TypeError");
        assert_eq!(failure.message, "bad type");
    }

    #[test]
    fn test_engine_reference_error() {
        let failure = failure_of("missingVariable + 1");
        assert_eq!(failure.name, "ReferenceError");
        assert!(failure.message.contains("missingVariable"));
    }

    #[test]
    fn test_thrown_primitive() {
        assert_eq!(failure_of("throw 'plain'"), EvalFailure::new("Error", "plain"));
    }

    #[test]
    fn test_binding_names() {
        assert!(validate_binding_name("x").is_ok());
        assert!(validate_binding_name("_private").is_ok());
        assert!(validate_binding_name("$el2").is_ok());
        assert!(validate_binding_name("2x").is_err());
        assert!(validate_binding_name("a-b").is_err());
        assert!(validate_binding_name("").is_err());
    }
}
