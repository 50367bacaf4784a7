//! Unified error type for all orchestration operations.
//!
//! Every failure the engine can surface is a variant of [`LlmError`],
//! giving callers a single type to match against regardless of which
//! backend or tool produced it. Variants carry enough context for retry
//! classification, user-facing messages, and diagnostics.
//!
//! # Retryability
//!
//! Only [`LlmError::Backend`] failures are ever retried, and only when
//! their status code marks them as transient:
//!
//! ```rust
//! use llm_conductor::LlmError;
//!
//! assert!(LlmError::backend(503, "overloaded").is_retryable());
//! assert!(LlmError::backend(429, "slow down").is_retryable());
//! assert!(LlmError::transport("connection reset").is_retryable());
//! assert!(!LlmError::backend(401, "bad key").is_retryable());
//! assert!(!LlmError::Configuration("no model".into()).is_retryable());
//! ```

use serde_json::Value;

/// The unified error type returned by the orchestrator, the failover
/// strategy, and backend implementations.
///
/// Variants are `#[non_exhaustive]`: new error kinds may be added in
/// minor releases without breaking downstream matches (always include a
/// wildcard arm).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LlmError {
    /// Missing or invalid setup: no model, an out-of-range setting, or a
    /// fallback list naming an unknown backend.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A transport or vendor-API failure reported by a backend.
    ///
    /// `status` is `None` (or `Some(0)`) when no response was received at
    /// all, e.g. DNS failure or connection reset.
    #[error("Backend error (status={status:?}): {message}")]
    Backend {
        /// The HTTP status code, if one was received.
        status: Option<u16>,
        /// A human-readable description of the failure.
        message: String,
    },

    /// The model requested a tool that is not registered.
    #[error("Tool not found: {tool_name}")]
    ToolNotFound {
        /// The name the model asked for.
        tool_name: String,
    },

    /// A tool raised an error or produced a result that is not a JSON
    /// object.
    #[error("Tool execution error ({tool_name}): {source}")]
    ToolExecution {
        /// The name of the tool that failed.
        tool_name: String,
        /// The underlying error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Two registered tools share a name.
    #[error("Duplicate tool: {tool_name}")]
    DuplicateTool {
        /// The name registered twice.
        tool_name: String,
    },

    /// Structured output could not be decoded or failed the schema, and no
    /// repair attempts were left.
    #[error("Schema validation error: {message}")]
    SchemaValidation {
        /// Summary of the final failure.
        message: String,
        /// Every violation (or the decode error) from the final check.
        violations: Vec<String>,
        /// The raw text the model returned.
        raw: String,
        /// The request that produced the output, serialized for diagnostics.
        request: Value,
    },

    /// Every backend and retry combination failed.
    #[error("All backends exhausted [{}]: {last_error}", .backends.join(", "))]
    BackendExhausted {
        /// Names of the backends attempted, in order.
        backends: Vec<String>,
        /// The failure from the final attempt.
        #[source]
        last_error: Box<LlmError>,
    },
}

impl LlmError {
    /// Creates a [`LlmError::Backend`] carrying a received status code.
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a [`LlmError::Backend`] for a request that never received a
    /// response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Backend {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a [`LlmError::Backend`] from an [`http::StatusCode`], for
    /// adapters built on `http`-based clients.
    pub fn from_status(status: http::StatusCode, message: impl Into<String>) -> Self {
        Self::backend(status.as_u16(), message)
    }

    /// Returns the backend status code, if this is a backend failure that
    /// received one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns `true` for transient backend failures that may succeed on
    /// retry: no response (status absent or 0), 429, or any 5xx.
    ///
    /// Every other error, including non-backend kinds, is permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Backend { status, .. } => {
                matches!(status, None | Some(0 | 429 | 500..=599))
            }
            _ => false,
        }
    }
}
