//! The request orchestrator.
//!
//! [`Orchestrator`] accumulates a conversation and its settings, then runs
//! the full protocol in [`send`](Orchestrator::send):
//!
//! ```text
//!   request ──► backend (retry / failover)
//!                 │
//!   tool loop ◄───┘  while tool calls pending and steps remain:
//!     │                run tools, append results, call again
//!     ▼
//!   repair loop      only with an output schema:
//!     │                decode + validate, feed problems back, call again
//!     ▼
//!   Reply::Text | Reply::Structured
//! ```
//!
//! Every backend call, tool execution and backoff delay is awaited in
//! sequence. The conversation buffer is private and only grows during
//! `send`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use llm_conductor::{DynProvider, JsonSchema, Orchestrator};
//! use serde_json::json;
//!
//! # async fn example(backend: Arc<dyn DynProvider>) -> Result<(), llm_conductor::LlmError> {
//! let mut orchestrator = Orchestrator::new(backend)
//!     .model("gpt-4o-mini")?
//!     .system("You grade essays.")
//!     .user("Grade this: ...")
//!     .schema(JsonSchema::new(json!({
//!         "type": "object",
//!         "required": ["score"],
//!         "properties": { "score": { "type": "integer", "minimum": 1, "maximum": 10 } }
//!     })))
//!     .repair_attempts(2);
//!
//! let reply = orchestrator.send().await?;
//! let score = reply.structured().and_then(|s| s.get("score"));
//! # Ok(())
//! # }
//! ```

mod repair;
mod tool_loop;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::chat::{ChatMessage, ChatResponse, to_json_map};
use crate::config::{DEFAULT_REPAIR_ATTEMPTS, OrchestratorConfig};
use crate::error::LlmError;
use crate::provider::{ChatRequest, DynProvider, JsonSchema};
use crate::registry::BackendRegistry;
use crate::retry::{FailoverProvider, RetryPolicy, Sleeper, TokioSleeper};
use crate::structured::StructuredResponse;
use crate::tool::{ToolHandler, ToolRegistry};

/// Lower bound on the derived tool-loop step budget.
const MIN_DEFAULT_STEPS: u32 = 5;

/// Drives backend calls, tool execution and structured-output repair for
/// one conversation.
///
/// Setters consume and return the builder. Those that can reject a value
/// return `Result`, so invalid settings fail where they are set rather
/// than at [`send`](Self::send) time.
pub struct Orchestrator {
    backend: Arc<dyn DynProvider>,
    fallbacks: Vec<Arc<dyn DynProvider>>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    model: Option<String>,
    temperature: Option<f32>,
    tools: ToolRegistry,
    max_steps: Option<u32>,
    schema: Option<JsonSchema>,
    repair_attempts: u32,
    messages: Vec<ChatMessage>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("backend", &self.backend.name())
            .field(
                "fallbacks",
                &self.fallbacks.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .field("policy", &self.policy)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("tools", &self.tools)
            .field("max_steps", &self.max_steps)
            .field("schema", &self.schema)
            .field("repair_attempts", &self.repair_attempts)
            .field("messages", &self.messages.len())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an orchestrator over `backend` with default settings: two
    /// retries, one repair attempt, no fallbacks, and no model.
    pub fn new(backend: Arc<dyn DynProvider>) -> Self {
        Self {
            backend,
            fallbacks: Vec::new(),
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            model: None,
            temperature: None,
            tools: ToolRegistry::new(),
            max_steps: None,
            schema: None,
            repair_attempts: DEFAULT_REPAIR_ATTEMPTS,
            messages: Vec::new(),
        }
    }

    /// Creates an orchestrator over `backend` with defaults taken from
    /// `config`, resolving its fallback list through `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Configuration`] if `config` is invalid or names
    /// a fallback backend `registry` cannot build.
    pub fn from_config(
        backend: Arc<dyn DynProvider>,
        config: &OrchestratorConfig,
        registry: &BackendRegistry,
    ) -> Result<Self, LlmError> {
        config.validate()?;
        let fallbacks = registry.build_all(&config.fallbacks)?;

        let mut orchestrator = Self::new(backend)
            .retry_policy(config.retry_policy())
            .repair_attempts(config.repair_attempts)
            .fallbacks(fallbacks);
        if let Some(model) = &config.model {
            orchestrator = orchestrator.model(model.clone())?;
        }
        if let Some(steps) = config.max_steps {
            orchestrator = orchestrator.max_steps(steps)?;
        }
        Ok(orchestrator)
    }

    // ── Conversation ────────────────────────────────────────────────

    /// Appends a system message.
    #[must_use]
    pub fn system(mut self, text: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::system(text));
        self
    }

    /// Appends a user message.
    #[must_use]
    pub fn user(mut self, text: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(text));
        self
    }

    // ── Settings ────────────────────────────────────────────────────

    /// Sets the model identifier.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Configuration`] for an empty or blank id.
    pub fn model(mut self, model: impl Into<String>) -> Result<Self, LlmError> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(LlmError::Configuration("model must not be empty".into()));
        }
        self.model = Some(model);
        Ok(self)
    }

    /// Sets the sampling temperature.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Configuration`] for a negative or non-finite
    /// value.
    pub fn temperature(mut self, temperature: f32) -> Result<Self, LlmError> {
        if !temperature.is_finite() || temperature < 0.0 {
            return Err(LlmError::Configuration(format!(
                "temperature must be a finite, non-negative number, got {temperature}"
            )));
        }
        self.temperature = Some(temperature);
        Ok(self)
    }

    /// Replaces the callable tools.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::DuplicateTool`] if two tools share a name.
    pub fn tools(mut self, tools: Vec<Arc<dyn ToolHandler>>) -> Result<Self, LlmError> {
        self.tools = ToolRegistry::from_handlers(tools)?;
        Ok(self)
    }

    /// Sets the tool-loop step budget. Without it the budget is twice the
    /// tool count, and never less than five.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Configuration`] for zero.
    pub fn max_steps(mut self, steps: u32) -> Result<Self, LlmError> {
        if steps == 0 {
            return Err(LlmError::Configuration("max_steps must be at least 1".into()));
        }
        self.max_steps = Some(steps);
        Ok(self)
    }

    /// Requires the final answer to be JSON conforming to `schema`.
    #[must_use]
    pub fn schema(mut self, schema: JsonSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Requires the final answer to match the schema derived from `T`.
    ///
    /// Requires the `schema` feature (enabled by default).
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Configuration`] if the schema cannot be derived.
    #[cfg(feature = "schema")]
    pub fn output_type<T: schemars::JsonSchema>(self) -> Result<Self, LlmError> {
        let schema = JsonSchema::from_type::<T>()
            .map_err(|e| LlmError::Configuration(format!("failed to derive output schema: {e}")))?;
        Ok(self.schema(schema))
    }

    /// Sets how many times invalid structured output is sent back for
    /// repair before failing. Default: 1.
    #[must_use]
    pub fn repair_attempts(mut self, attempts: u32) -> Self {
        self.repair_attempts = attempts;
        self
    }

    /// Sets the retries per backend for transient failures. Default: 2.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.policy.max_retries = retries;
        self
    }

    /// Sets the backends tried, in order, after the primary is exhausted.
    #[must_use]
    pub fn fallbacks(mut self, fallbacks: Vec<Arc<dyn DynProvider>>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// Replaces the whole retry policy, including the backoff curve.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the sleeper used for backoff delays.
    #[must_use]
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    // ── Observers ───────────────────────────────────────────────────

    /// Builds the request the next backend call would send.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Configuration`] if no model is set.
    pub fn request(&self) -> Result<ChatRequest, LlmError> {
        let model = self
            .model
            .clone()
            .ok_or_else(|| LlmError::Configuration("no model set".into()))?;
        let mut request =
            ChatRequest::new(model, self.messages.clone())?.with_tools(self.tools.definitions());
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(schema) = &self.schema {
            request = request.with_schema(schema.clone());
        }
        Ok(request)
    }

    /// The conversation so far, including turns appended by `send`.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The retry policy in effect.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    // ── Execution ───────────────────────────────────────────────────

    /// Runs the request to a final answer.
    ///
    /// Tool calls are executed and fed back until the model stops asking
    /// or the step budget runs out; in the latter case the last response
    /// is returned with its calls still pending. With a schema set, the
    /// answer is then decoded and validated, with up to
    /// `repair_attempts` corrective re-queries.
    ///
    /// # Errors
    ///
    /// - [`LlmError::Configuration`] if no model is set
    /// - [`LlmError::Backend`] or [`LlmError::BackendExhausted`] when the
    ///   backends fail
    /// - [`LlmError::ToolNotFound`] / [`LlmError::ToolExecution`] from the
    ///   tool loop
    /// - [`LlmError::SchemaValidation`] once repair attempts are spent
    #[instrument(skip_all, fields(model = self.model.as_deref().unwrap_or("")))]
    pub async fn send(&mut self) -> Result<Reply, LlmError> {
        let backend = self.effective_backend();
        let response = self.call(backend.as_ref()).await?;
        let response = self.run_tool_loop(backend.as_ref(), response).await?;

        match self.schema.clone() {
            None => Ok(Reply::Text(response)),
            Some(schema) => self
                .repair(backend.as_ref(), response, &schema)
                .await
                .map(Reply::Structured),
        }
    }

    /// The primary backend, wrapped in the failover strategy when retries
    /// or fallbacks are configured.
    fn effective_backend(&self) -> Arc<dyn DynProvider> {
        if self.policy.max_retries == 0 && self.fallbacks.is_empty() {
            return Arc::clone(&self.backend);
        }
        Arc::new(
            FailoverProvider::new(Arc::clone(&self.backend))
                .with_fallbacks(self.fallbacks.clone())
                .with_policy(self.policy)
                .with_sleeper(Arc::clone(&self.sleeper)),
        )
    }

    /// Builds a fresh request from the current conversation and sends it.
    async fn call(&self, backend: &dyn DynProvider) -> Result<ChatResponse, LlmError> {
        let request = self.request()?;
        backend.chat_boxed(&request).await
    }

    fn step_budget(&self) -> u32 {
        self.max_steps.unwrap_or_else(|| {
            u32::try_from(self.tools.len())
                .unwrap_or(u32::MAX)
                .saturating_mul(2)
                .max(MIN_DEFAULT_STEPS)
        })
    }
}

/// The outcome of [`Orchestrator::send`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// No schema was set; the final backend response.
    Text(ChatResponse),
    /// A schema was set and the answer passed it.
    Structured(StructuredResponse),
}

impl Reply {
    /// The final backend response.
    pub fn response(&self) -> &ChatResponse {
        match self {
            Self::Text(response) => response,
            Self::Structured(structured) => structured.response(),
        }
    }

    /// The final response text.
    pub fn text(&self) -> &str {
        self.response().text()
    }

    /// The validated structured answer, if a schema was set.
    pub fn structured(&self) -> Option<&StructuredResponse> {
        match self {
            Self::Structured(structured) => Some(structured),
            Self::Text(_) => None,
        }
    }

    /// Consumes the reply, returning the structured answer if there is one.
    pub fn into_structured(self) -> Option<StructuredResponse> {
        match self {
            Self::Structured(structured) => Some(structured),
            Self::Text(_) => None,
        }
    }

    /// Returns the reply as a plain JSON object.
    pub fn to_map(&self) -> Map<String, Value> {
        to_json_map(self)
    }
}
