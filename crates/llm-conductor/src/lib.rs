//! # llm-conductor
//!
//! Provider-agnostic orchestration for LLM chat completion requests.
//!
//! Describe an intent once (a conversation, optional callable tools, an
//! optional output schema) and [`Orchestrator::send`] runs the multi-round
//! protocol needed to reach a final, validated answer:
//!
//! - it executes model-requested tool calls and feeds the results back,
//! - it retries transient backend failures with exponential backoff,
//! - it fails over to alternate backends,
//! - it repairs invalid structured output by re-querying the model with
//!   the validation errors.
//!
//! Vendor adapters are not part of this crate. Anything that implements
//! [`Provider`] can be orchestrated.
//!
//! # Architecture
//!
//! ```text
//!              ┌─────────────────────────────────────┐
//!              │            Orchestrator             │
//!              │   tool loop  ·  repair loop         │
//!              └──────────────────┬──────────────────┘
//!                                 │ ChatRequest
//!                                 ▼
//!              ┌─────────────────────────────────────┐
//!              │          FailoverProvider           │
//!              │   retry + backoff, then fallbacks   │
//!              └──────┬───────────────────┬──────────┘
//!                     ▼                   ▼
//!              ┌─────────────┐     ┌─────────────┐
//!              │   primary   │     │  fallback…  │   impl Provider
//!              └─────────────┘     └─────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use llm_conductor::{DynProvider, Orchestrator};
//!
//! # async fn example(backend: Arc<dyn DynProvider>) -> Result<(), llm_conductor::LlmError> {
//! let mut orchestrator = Orchestrator::new(backend)
//!     .model("gpt-4o-mini")?
//!     .system("You are terse.")
//!     .user("Explain ownership in Rust");
//!
//! let reply = orchestrator.send().await?;
//! println!("{}", reply.text());
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`chat`] | Messages, tool calls, tool results, and responses |
//! | [`config`] | Deserializable orchestrator and backend settings |
//! | [`error`] | Unified [`LlmError`] taxonomy |
//! | [`orchestrator`] | The [`Orchestrator`] builder and its loops |
//! | [`provider`] | The [`Provider`] trait, [`ChatRequest`], and [`JsonSchema`] |
//! | [`registry`] | Backend factories resolved by name from configuration |
//! | [`retry`] | Backoff policy and the [`FailoverProvider`] |
//! | [`schema`] | The keyword-subset schema validator |
//! | [`structured`] | Validated structured responses |
//! | [`tool`] | Tool handlers and the name-keyed registry |

#![warn(missing_docs)]

pub mod chat;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod registry;
pub mod retry;
pub mod schema;
pub mod structured;
pub mod tool;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_helpers;

// ── Core re-exports ────────────────────────────────────────────────
//
// Only the types that appear in nearly every program are re-exported
// at the crate root. Everything else lives in its submodule:
//
//   llm_conductor::config::*      OrchestratorConfig, BackendConfig
//   llm_conductor::registry::*    BackendRegistry, BackendFactory
//   llm_conductor::retry::*       RetryPolicy, Sleeper, TokioSleeper
//   llm_conductor::structured::*  OutputCheck, check_output
//   llm_conductor::tool::*        ToolOutput, ToolError, tool_fn
//   llm_conductor::mock::*        MockProvider (test-utils feature)

pub use chat::{ChatMessage, ChatResponse, ChatRole, ToolCall, ToolResult};
pub use error::LlmError;
pub use orchestrator::{Orchestrator, Reply};
pub use provider::{ChatRequest, DynProvider, JsonSchema, Provider, ToolDefinition};
pub use retry::{FailoverProvider, RetryPolicy};
pub use structured::StructuredResponse;
pub use tool::{ToolHandler, ToolRegistry};
