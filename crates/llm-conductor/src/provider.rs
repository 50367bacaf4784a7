//! Backend trait and request types.
//!
//! This module defines two core abstractions:
//!
//! - **[`Provider`]**: the trait every backend adapter implements. It uses
//!   Rust 2024's native async-fn-in-traits (AFIT), so implementations are
//!   plain `async fn`s with no macro overhead.
//!
//! - **[`DynProvider`]**: an object-safe mirror of `Provider` that uses
//!   boxed futures. A blanket `impl<T: Provider> DynProvider for T`
//!   bridges the two, so any concrete backend can be stored as
//!   `Arc<dyn DynProvider>` with zero boilerplate. The orchestrator and
//!   the failover strategy hold backends this way.
//!
//! # Requests
//!
//! A [`ChatRequest`] is the complete, immutable intent for one backend
//! call. Its constructor rejects an empty model id, and it has no
//! mutating methods; the orchestrator builds a fresh one for every round
//! trip.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::chat::{ChatMessage, ChatResponse, to_json_map};
use crate::error::LlmError;

/// The trait every backend adapter implements.
///
/// Adapters map a [`ChatRequest`] onto a vendor's wire format, perform the
/// call, and normalize the reply into a [`ChatResponse`]. Any transport or
/// vendor failure is reported as [`LlmError::Backend`] with the received
/// status code, which drives retry classification.
///
/// Cross-cutting concerns like retries and failover are handled by
/// [`FailoverProvider`](crate::retry::FailoverProvider), keeping adapters
/// focused on mapping.
pub trait Provider: Send + Sync {
    /// Sends a chat request and returns the normalized response.
    fn chat(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ChatResponse, LlmError>> + Send;

    /// A short name identifying this backend (e.g. `"openai"`), used in
    /// logs and in [`LlmError::BackendExhausted`].
    fn name(&self) -> &str;
}

/// Object-safe counterpart of [`Provider`] for dynamic dispatch.
///
/// You rarely implement this directly: the blanket
/// `impl<T: Provider> DynProvider for T` does it for you.
pub trait DynProvider: Send + Sync {
    /// Boxed-future version of [`Provider::chat`].
    fn chat_boxed<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChatResponse, LlmError>> + Send + 'a>>;

    /// See [`Provider::name`].
    fn name(&self) -> &str;
}

impl<T: Provider> DynProvider for T {
    fn chat_boxed<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ChatResponse, LlmError>> + Send + 'a>> {
        Box::pin(self.chat(request))
    }

    fn name(&self) -> &str {
        Provider::name(self)
    }
}

/// The complete intent for one backend call.
///
/// ```rust
/// use llm_conductor::{ChatMessage, ChatRequest};
///
/// let request = ChatRequest::new("gpt-4o-mini", vec![ChatMessage::user("Hello")])?
///     .with_temperature(0.2);
/// assert_eq!(request.model(), "gpt-4o-mini");
///
/// assert!(ChatRequest::new("", vec![]).is_err());
/// # Ok::<(), llm_conductor::LlmError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    messages: Vec<ChatMessage>,
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<JsonSchema>,
}

impl ChatRequest {
    /// Creates a request for `model` over `messages`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Configuration`] if `model` is empty or only
    /// whitespace.
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Result<Self, LlmError> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(LlmError::Configuration(
                "request model must be a non-empty string".into(),
            ));
        }
        Ok(Self {
            messages,
            model,
            temperature: None,
            tools: Vec::new(),
            schema: None,
        })
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the tool definitions advertised to the backend.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the schema the output must conform to.
    #[must_use]
    pub fn with_schema(mut self, schema: JsonSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// The conversation, in order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The model identifier. Never empty.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The sampling temperature, if set.
    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// Tool definitions to advertise.
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// The output schema, if structured output was requested.
    pub fn schema(&self) -> Option<&JsonSchema> {
        self.schema.as_ref()
    }

    /// Returns the request as a plain JSON object.
    pub fn to_map(&self) -> Map<String, Value> {
        to_json_map(self)
    }
}

/// A tool advertised to the model.
///
/// Adapters translate this into their native tool format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool's name, matched against [`ToolCall::name`](crate::ToolCall::name).
    pub name: String,
    /// Human-readable description shown to the model so it knows when to
    /// use this tool.
    pub description: String,
    /// Schema describing the tool's expected arguments.
    pub input_schema: JsonSchema,
}

/// A schema document used for structured output or tool arguments.
///
/// Wraps a [`serde_json::Value`] and validates against it with the
/// keyword subset implemented in [`crate::schema`]. The inner value is
/// private; use [`as_value`](Self::as_value) for read access.
///
/// ```rust
/// use llm_conductor::JsonSchema;
/// use serde_json::json;
///
/// let schema = JsonSchema::new(json!({
///     "type": "object",
///     "properties": { "name": { "type": "string" } },
///     "required": ["name"]
/// }));
///
/// assert!(schema.validate(&json!({"name": "Ada"})).is_empty());
/// assert_eq!(schema.validate(&json!({})).len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonSchema(Value);

impl JsonSchema {
    /// Creates a schema from a raw JSON value.
    pub fn new(schema: Value) -> Self {
        Self(schema)
    }

    /// Returns a reference to the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Derives a schema from a Rust type that implements
    /// [`schemars::JsonSchema`].
    ///
    /// Requires the `schema` feature (enabled by default).
    ///
    /// # Errors
    ///
    /// Returns an error if the generated schema cannot be serialized to
    /// `serde_json::Value` (should not happen in practice).
    #[cfg(feature = "schema")]
    pub fn from_type<T: schemars::JsonSchema>() -> Result<Self, serde_json::Error> {
        let schema = schemars::schema_for!(T);
        let value = serde_json::to_value(schema)?;
        Ok(Self(value))
    }

    /// Validates `value` against this schema, returning every violation.
    /// An empty list means the value is valid.
    pub fn validate(&self, value: &Value) -> Vec<String> {
        crate::schema::validate(value, &self.0, crate::schema::ROOT_PATH)
    }
}
