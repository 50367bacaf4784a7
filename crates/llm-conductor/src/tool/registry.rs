//! Tool registry for resolving and executing tools by name.

use std::collections::HashMap;
use std::sync::Arc;

use super::{ToolError, ToolHandler};
use crate::chat::{ToolCall, ToolResult};
use crate::error::LlmError;
use crate::provider::ToolDefinition;

/// A registry of tool handlers, indexed by name.
///
/// Registration is explicit and rejects duplicate names. Definitions are
/// reported in registration order, so the tool list sent to backends is
/// deterministic.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    handlers: Vec<Arc<dyn ToolHandler>>,
    by_name: HashMap<String, usize>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field(
                "tools",
                &self.handlers.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a list of handlers.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::DuplicateTool`] if two handlers share a name.
    pub fn from_handlers(
        handlers: impl IntoIterator<Item = Arc<dyn ToolHandler>>,
    ) -> Result<Self, LlmError> {
        let mut registry = Self::new();
        for handler in handlers {
            registry.register_shared(handler)?;
        }
        Ok(registry)
    }

    /// Registers a tool handler.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::DuplicateTool`] if a handler with the same name
    /// is already registered.
    pub fn register(&mut self, handler: impl ToolHandler + 'static) -> Result<&mut Self, LlmError> {
        self.register_shared(Arc::new(handler))
    }

    /// Registers a shared tool handler.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::DuplicateTool`] if a handler with the same name
    /// is already registered.
    pub fn register_shared(&mut self, handler: Arc<dyn ToolHandler>) -> Result<&mut Self, LlmError> {
        let name = handler.name().to_owned();
        if self.by_name.contains_key(&name) {
            return Err(LlmError::DuplicateTool { tool_name: name });
        }
        self.by_name.insert(name, self.handlers.len());
        self.handlers.push(handler);
        Ok(self)
    }

    /// Returns the handler for the given tool name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.by_name.get(name).map(|&index| &self.handlers[index])
    }

    /// Returns whether a tool with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Returns the definitions of all registered tools, in registration
    /// order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.handlers.iter().map(|h| h.definition()).collect()
    }

    /// Returns the number of registered tools.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Executes a single tool call.
    ///
    /// 1. Looks up the handler by [`ToolCall::name`]
    /// 2. Invokes it with the call's arguments
    /// 3. Requires the output to be a JSON object
    ///
    /// # Errors
    ///
    /// - [`LlmError::ToolNotFound`] if no handler has that name
    /// - [`LlmError::ToolExecution`] if the handler fails or returns
    ///   anything other than a JSON object
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult, LlmError> {
        let handler = self.get(&call.name).ok_or_else(|| LlmError::ToolNotFound {
            tool_name: call.name.clone(),
        })?;

        tracing::debug!(tool = %call.name, call_id = %call.id, "executing tool");

        let output = handler
            .execute(call.arguments.clone())
            .await
            .map_err(|e| LlmError::ToolExecution {
                tool_name: call.name.clone(),
                source: Box::new(e),
            })?;

        let content = output.into_object().map_err(|value| LlmError::ToolExecution {
            tool_name: call.name.clone(),
            source: Box::new(ToolError::new(format!(
                "tool returned a non-object result: {value}"
            ))),
        })?;

        Ok(ToolResult {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            content,
        })
    }
}
