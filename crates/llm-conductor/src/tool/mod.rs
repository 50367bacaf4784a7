//! Tool execution.
//!
//! This module provides the runtime layer for tools that the model
//! invokes during a conversation. It builds on the foundational types
//! from [`chat`](crate::chat) ([`ToolCall`](crate::chat::ToolCall),
//! [`ToolResult`](crate::chat::ToolResult)) and
//! [`provider`](crate::provider) ([`ToolDefinition`](crate::provider::ToolDefinition)).
//!
//! # Architecture
//!
//! ```text
//!   ToolHandler     defines a single tool (name, schema, execute fn)
//!       │
//!   ToolRegistry    stores handlers by name, rejects duplicates, dispatches
//!       │
//!   Orchestrator    drives the call → execute → feed back cycle
//! ```
//!
//! # Example
//!
//! ```rust
//! use llm_conductor::tool::{ToolRegistry, tool_fn};
//! use llm_conductor::{JsonSchema, ToolCall, ToolDefinition};
//! use serde_json::{Map, json};
//!
//! # async fn example() -> Result<(), llm_conductor::LlmError> {
//! let mut registry = ToolRegistry::new();
//! registry.register(tool_fn(
//!     ToolDefinition {
//!         name: "echo".into(),
//!         description: "Echo the arguments back".into(),
//!         input_schema: JsonSchema::new(json!({"type": "object"})),
//!     },
//!     |args| async move { Ok(args) },
//! ))?;
//!
//! let mut args = Map::new();
//! args.insert("text".into(), json!("hi"));
//! let result = registry.execute(&ToolCall::new("call_1", "echo", args)).await?;
//! assert_eq!(result.content["text"], "hi");
//! # Ok(())
//! # }
//! ```

mod error;
mod handler;
mod helpers;
mod output;
mod registry;

pub use error::ToolError;
pub use handler::{FnToolHandler, ToolHandler};
pub use helpers::tool_fn;
pub use output::ToolOutput;
pub use registry::ToolRegistry;
