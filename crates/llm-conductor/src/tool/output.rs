//! Tool output types.

use serde::Serialize;
use serde_json::{Map, Value};

use super::ToolError;

/// Output returned by a tool handler.
///
/// Wraps the JSON value the tool produced. The orchestrator accepts only
/// JSON objects as tool results; any other shape fails the call with
/// [`LlmError::ToolExecution`](crate::LlmError::ToolExecution).
///
/// # Example
///
/// ```rust
/// use llm_conductor::tool::ToolOutput;
/// use serde_json::json;
///
/// let output = ToolOutput::from(json!({"result": 42}));
/// assert!(output.as_value().is_object());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    value: Value,
}

impl ToolOutput {
    /// Creates an output from a result object.
    pub fn new(content: Map<String, Value>) -> Self {
        Self {
            value: Value::Object(content),
        }
    }

    /// Serializes any `Serialize` value into an output.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if `value` cannot be represented as JSON
    /// (e.g. a map with non-string keys).
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ToolError> {
        serde_json::to_value(value)
            .map(|value| Self { value })
            .map_err(|e| ToolError::with_source("tool result is not representable as JSON", e))
    }

    /// The raw output value.
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    /// Returns the result object, or the original value if the output is
    /// not a JSON object.
    pub(crate) fn into_object(self) -> Result<Map<String, Value>, Value> {
        match self.value {
            Value::Object(map) => Ok(map),
            other => Err(other),
        }
    }
}

impl From<Map<String, Value>> for ToolOutput {
    fn from(content: Map<String, Value>) -> Self {
        Self::new(content)
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        Self { value }
    }
}
