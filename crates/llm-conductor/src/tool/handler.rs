//! Tool handler trait and the closure-backed implementation.

use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};

use super::{ToolError, ToolOutput};
use crate::provider::{JsonSchema, ToolDefinition};

/// A single tool that can be invoked by the model.
///
/// Implement this trait for tools that carry state. For simple tools, use
/// [`super::tool_fn`] to wrap a closure.
///
/// The trait is object-safe (uses boxed futures) so handlers can be
/// stored as `Arc<dyn ToolHandler>`.
///
/// # Example
///
/// ```rust
/// use llm_conductor::tool::{ToolError, ToolHandler, ToolOutput};
/// use llm_conductor::JsonSchema;
/// use serde_json::{Map, Value, json};
/// use std::future::Future;
/// use std::pin::Pin;
///
/// struct Clock;
///
/// impl ToolHandler for Clock {
///     fn name(&self) -> &str {
///         "clock"
///     }
///
///     fn description(&self) -> &str {
///         "Returns the current time"
///     }
///
///     fn input_schema(&self) -> JsonSchema {
///         JsonSchema::new(json!({"type": "object"}))
///     }
///
///     fn execute<'a>(
///         &'a self,
///         _arguments: Map<String, Value>,
///     ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>> {
///         Box::pin(async move { Ok(json!({"time": "12:00"}).into()) })
///     }
/// }
/// ```
pub trait ToolHandler: Send + Sync {
    /// The tool's unique name.
    fn name(&self) -> &str;

    /// Description shown to the model.
    fn description(&self) -> &str;

    /// Schema describing the expected arguments.
    fn input_schema(&self) -> JsonSchema;

    /// Runs the tool with the arguments the model supplied.
    fn execute<'a>(
        &'a self,
        arguments: Map<String, Value>,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>>;

    /// The definition advertised to backends.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_owned(),
            description: self.description().to_owned(),
            input_schema: self.input_schema(),
        }
    }
}

/// A tool handler backed by an async closure.
///
/// Created via [`super::tool_fn`].
pub struct FnToolHandler<F> {
    pub(crate) definition: ToolDefinition,
    pub(crate) handler: F,
}

impl<F> std::fmt::Debug for FnToolHandler<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnToolHandler")
            .field("name", &self.definition.name)
            .finish_non_exhaustive()
    }
}

impl<F, Fut, O> ToolHandler for FnToolHandler<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, ToolError>> + Send + 'static,
    O: Into<ToolOutput> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.definition.name
    }

    fn description(&self) -> &str {
        &self.definition.description
    }

    fn input_schema(&self) -> JsonSchema {
        self.definition.input_schema.clone()
    }

    fn execute<'a>(
        &'a self,
        arguments: Map<String, Value>,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + 'a>> {
        let fut = (self.handler)(arguments);
        Box::pin(async move { fut.await.map(Into::into) })
    }

    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }
}
