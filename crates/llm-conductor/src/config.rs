//! Orchestrator settings supplied by the embedding application.
//!
//! Loading settings (files, environment variables) is the caller's job.
//! These structs only describe the shape: they derive `Deserialize` so
//! any serde format can feed them, and every field has a default so a
//! partial document is enough.
//!
//! ```rust
//! use llm_conductor::config::OrchestratorConfig;
//! use serde_json::json;
//!
//! let config = OrchestratorConfig::from_value(json!({
//!     "model": "gpt-4o-mini",
//!     "max_retries": 3,
//!     "fallbacks": [{ "backend": "ollama", "model": "llama3" }]
//! }))?;
//! assert_eq!(config.repair_attempts, 1);
//! assert_eq!(config.fallbacks[0].backend, "ollama");
//!
//! assert!(OrchestratorConfig::from_value(json!({ "max_retries": -1 })).is_err());
//! # Ok::<(), llm_conductor::LlmError>(())
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LlmError;
use crate::retry::{DEFAULT_MAX_RETRIES, RetryPolicy};

/// Default number of repair re-queries for invalid structured output.
pub const DEFAULT_REPAIR_ATTEMPTS: u32 = 1;

/// Defaults applied to an [`Orchestrator`](crate::Orchestrator) built with
/// [`from_config`](crate::Orchestrator::from_config).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Default model identifier.
    pub model: Option<String>,
    /// Retries per backend for transient failures. Default: 2.
    pub max_retries: u32,
    /// Repair re-queries for invalid structured output. Default: 1.
    pub repair_attempts: u32,
    /// Tool-loop step budget. `None` derives it from the tool count.
    pub max_steps: Option<u32>,
    /// Delay before the first retry, in milliseconds. Default: 500.
    pub base_delay_ms: u64,
    /// Upper bound on any retry delay, in milliseconds. Default: 30000.
    pub max_delay_ms: u64,
    /// Backends tried, in order, after the primary is exhausted.
    pub fallbacks: Vec<BackendConfig>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            model: None,
            max_retries: DEFAULT_MAX_RETRIES,
            repair_attempts: DEFAULT_REPAIR_ATTEMPTS,
            max_steps: None,
            base_delay_ms: u64::try_from(policy.base_delay.as_millis()).unwrap_or(u64::MAX),
            max_delay_ms: u64::try_from(policy.max_delay.as_millis()).unwrap_or(u64::MAX),
            fallbacks: Vec::new(),
        }
    }
}

impl OrchestratorConfig {
    /// Parses and validates settings from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Configuration`] for a malformed document
    /// (including negative counts and unknown keys) or settings that fail
    /// [`validate`](Self::validate).
    pub fn from_value(value: Value) -> Result<Self, LlmError> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| LlmError::Configuration(format!("invalid orchestrator config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints that types alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Configuration`] for an empty model, a zero step
    /// budget, a delay cap below the base delay, or a fallback entry with
    /// no backend name.
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(LlmError::Configuration("model must not be empty".into()));
        }
        if self.max_steps == Some(0) {
            return Err(LlmError::Configuration("max_steps must be at least 1".into()));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(LlmError::Configuration(format!(
                "max_delay_ms ({}) is below base_delay_ms ({})",
                self.max_delay_ms, self.base_delay_ms
            )));
        }
        if let Some(index) = self.fallbacks.iter().position(|f| f.backend.trim().is_empty()) {
            return Err(LlmError::Configuration(format!(
                "fallback #{index} has no backend name"
            )));
        }
        Ok(())
    }

    /// The retry policy these settings describe.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Settings for building one backend through a
/// [`BackendRegistry`](crate::registry::BackendRegistry).
///
/// Common fields work across backends; backend-specific options go in
/// `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Registered backend name (e.g. "openai", "ollama"). Matched
    /// case-insensitively.
    pub backend: String,
    /// Model identifier this backend should use.
    pub model: String,
    /// Custom base URL for the backend's API.
    pub base_url: Option<String>,
    /// API key for authenticated backends.
    pub api_key: Option<String>,
    /// Backend-specific options. Each factory documents the keys it reads.
    pub extra: HashMap<String, Value>,
}

impl BackendConfig {
    /// Creates a config for `backend` serving `model`.
    pub fn new(backend: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Adds a backend-specific option.
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Gets a string option from `extra`.
    pub fn get_extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Gets a bool option from `extra`.
    pub fn get_extra_bool(&self, key: &str) -> Option<bool> {
        self.extra.get(key).and_then(Value::as_bool)
    }

    /// Gets an integer option from `extra`.
    pub fn get_extra_i64(&self, key: &str) -> Option<i64> {
        self.extra.get(key).and_then(Value::as_i64)
    }
}
