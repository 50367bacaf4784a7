//! Structured output: validated JSON responses and repair feedback.
//!
//! When an output schema is configured, the orchestrator decodes the
//! model's final text as JSON and validates it. Each check yields an
//! [`OutputCheck`]: either the decoded value, or a classified problem that
//! the repair loop turns into conversational feedback.
//!
//! ```rust
//! use llm_conductor::structured::{OutputCheck, check_output};
//! use llm_conductor::JsonSchema;
//! use serde_json::json;
//!
//! let schema = JsonSchema::new(json!({
//!     "type": "object",
//!     "properties": { "score": { "type": "integer", "maximum": 10 } }
//! }));
//!
//! assert!(matches!(check_output(r#"{"score": 7}"#, &schema), OutputCheck::Valid(_)));
//! match check_output(r#"{"score": 15}"#, &schema) {
//!     OutputCheck::Invalid(problem) => assert!(problem.violations[0].contains("maximum")),
//!     OutputCheck::Valid(_) => unreachable!(),
//! }
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::chat::{ChatResponse, to_json_map};
use crate::provider::JsonSchema;

/// A response whose text decoded to JSON and passed the output schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredResponse {
    #[serde(flatten)]
    response: ChatResponse,
    value: Value,
}

impl StructuredResponse {
    /// Pairs a response with its decoded, validated value.
    pub fn new(response: ChatResponse, value: Value) -> Self {
        Self { response, value }
    }

    /// The decoded value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The response the value was decoded from.
    pub fn response(&self) -> &ChatResponse {
        &self.response
    }

    /// The raw text the value was decoded from.
    pub fn text(&self) -> &str {
        self.response.text()
    }

    /// Looks up `key` when the value is a JSON object.
    ///
    /// Returns `None` for an absent key, and for any value that is not an
    /// object (a list, a string, a number).
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value.as_object().and_then(|map| map.get(key))
    }

    /// Deserializes the value into `T`.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the value does not fit `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.value.clone())
    }

    /// Returns the response and its value as a plain JSON object.
    pub fn to_map(&self) -> Map<String, Value> {
        to_json_map(self)
    }
}

/// Why a structured-output check failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputProblem {
    /// One-line summary.
    pub message: String,
    /// Every violation found, or the decode error.
    pub violations: Vec<String>,
}

/// The outcome of checking model text against an output schema.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputCheck {
    /// The text decoded and every schema keyword passed.
    Valid(Value),
    /// The text was not JSON, or the decoded value broke the schema.
    Invalid(OutputProblem),
}

/// Decodes `text` as JSON and validates it against `schema`.
pub fn check_output(text: &str, schema: &JsonSchema) -> OutputCheck {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            let detail = format!("response is not valid JSON: {e}");
            return OutputCheck::Invalid(OutputProblem {
                message: detail.clone(),
                violations: vec![detail],
            });
        }
    };

    let violations = schema.validate(&value);
    if violations.is_empty() {
        OutputCheck::Valid(value)
    } else {
        OutputCheck::Invalid(OutputProblem {
            message: format!(
                "response failed schema validation with {} violation(s)",
                violations.len()
            ),
            violations,
        })
    }
}

/// The user message that asks the model to correct its output.
pub(crate) fn repair_feedback(problem: &OutputProblem) -> String {
    let mut feedback = String::from("Your previous response could not be accepted:\n");
    for violation in &problem.violations {
        feedback.push_str("- ");
        feedback.push_str(violation);
        feedback.push('\n');
    }
    feedback.push_str(
        "Reply again with only a JSON value that conforms to the required schema. \
         No markdown, no explanation.",
    );
    feedback
}
