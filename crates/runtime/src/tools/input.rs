//! Typed tool input helpers.

use crate::tools::ToolError;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserialize raw tool arguments into a dedicated input type.
///
/// Shape mismatches become [`ToolError::InvalidInput`], which the engine
/// reports back to the model as an error result.
pub fn parse_input<T: DeserializeOwned>(input: Value) -> Result<T, ToolError> {
    serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

/// JSON Schema for a tool input type.
pub fn schema_for<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| serde_json::json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct EchoInput {
        /// Text to echo back.
        message: String,
        #[serde(default)]
        repeat: Option<u32>,
    }

    #[test]
    fn parse_valid_input() {
        let input: EchoInput = parse_input(json!({"message": "hi", "repeat": 2})).unwrap();
        assert_eq!(input.message, "hi");
        assert_eq!(input.repeat, Some(2));
    }

    #[test]
    fn malformed_input_is_invalid_input_error() {
        let err = parse_input::<EchoInput>(json!({"repeat": "lots"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn schema_lists_properties() {
        let schema = schema_for::<EchoInput>();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["message"].is_object());
        assert_eq!(schema["required"], json!(["message"]));
    }
}
