//! Helper functions for creating tool handlers.

use std::future::Future;

use serde_json::{Map, Value};

use super::{FnToolHandler, ToolError, ToolOutput};
use crate::provider::ToolDefinition;

/// Creates a [`ToolHandler`](super::ToolHandler) from an async closure.
///
/// The closure receives the tool's arguments and returns a
/// `Result<impl Into<ToolOutput>, ToolError>`. Returning a
/// `serde_json::Value` or `Map` works via the `From` impls on
/// `ToolOutput`.
///
/// # Example
///
/// ```rust
/// use llm_conductor::tool::tool_fn;
/// use llm_conductor::{JsonSchema, ToolDefinition};
/// use serde_json::json;
///
/// let handler = tool_fn(
///     ToolDefinition {
///         name: "add".into(),
///         description: "Add two numbers".into(),
///         input_schema: JsonSchema::new(json!({
///             "type": "object",
///             "properties": {
///                 "a": { "type": "number" },
///                 "b": { "type": "number" }
///             },
///             "required": ["a", "b"]
///         })),
///     },
///     |args| async move {
///         let a = args.get("a").and_then(|v| v.as_f64()).unwrap_or(0.0);
///         let b = args.get("b").and_then(|v| v.as_f64()).unwrap_or(0.0);
///         Ok(json!({ "sum": a + b }))
///     },
/// );
/// ```
pub fn tool_fn<F, Fut, O>(definition: ToolDefinition, handler: F) -> FnToolHandler<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ToolError>> + Send + 'static,
    O: Into<ToolOutput> + Send + 'static,
{
    FnToolHandler {
        definition,
        handler,
    }
}
