//! Backend registry for configuration-driven fallback lists.
//!
//! A [`BackendRegistry`] maps backend names to [`BackendFactory`]s so a
//! fallback list written in configuration can be turned into live
//! backends. There is no global registry: the embedding application builds
//! one, registers the adapters it links, and passes it to
//! [`Orchestrator::from_config`](crate::Orchestrator::from_config).
//!
//! # Example
//!
//! ```rust,ignore
//! use llm_conductor::config::BackendConfig;
//! use llm_conductor::registry::{BackendFactory, BackendRegistry};
//!
//! struct OllamaFactory;
//!
//! impl BackendFactory for OllamaFactory {
//!     fn name(&self) -> &str { "ollama" }
//!
//!     fn build(&self, config: &BackendConfig) -> Result<Box<dyn DynProvider>, LlmError> {
//!         // Build and return the adapter
//!     }
//! }
//!
//! let mut registry = BackendRegistry::new();
//! registry.register(Box::new(OllamaFactory));
//! let backend = registry.build(&BackendConfig::new("ollama", "llama3"))?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::BackendConfig;
use crate::error::LlmError;
use crate::provider::DynProvider;

/// Creates backends from configuration.
///
/// Implement this for each adapter that should be selectable by name.
pub trait BackendFactory: Send + Sync {
    /// The name used for registration and lookup, e.g. `"openai"`.
    fn name(&self) -> &str;

    /// Creates a backend from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is missing fields this backend needs.
    fn build(&self, config: &BackendConfig) -> Result<Box<dyn DynProvider>, LlmError>;
}

/// Backend factories indexed by lowercase name.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: HashMap<String, Arc<dyn BackendFactory>>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.backends())
            .finish()
    }
}

impl BackendRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory, replacing any factory with the same name.
    pub fn register(&mut self, factory: Box<dyn BackendFactory>) -> &mut Self {
        self.register_shared(Arc::from(factory))
    }

    /// Registers a shared factory, replacing any factory with the same name.
    pub fn register_shared(&mut self, factory: Arc<dyn BackendFactory>) -> &mut Self {
        self.factories.insert(factory.name().to_lowercase(), factory);
        self
    }

    /// Whether a factory is registered under `name` (case-insensitive).
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_lowercase())
    }

    /// Registered backend names, sorted.
    pub fn backends(&self) -> Vec<String> {
        let mut names: Vec<_> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Builds the backend `config` names.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Configuration`] if no factory is registered for
    /// `config.backend`, or whatever the factory returns.
    pub fn build(&self, config: &BackendConfig) -> Result<Box<dyn DynProvider>, LlmError> {
        let factory = self
            .factories
            .get(&config.backend.to_lowercase())
            .ok_or_else(|| {
                LlmError::Configuration(format!(
                    "unknown backend '{}'. Available: {:?}",
                    config.backend,
                    self.backends()
                ))
            })?;
        factory.build(config)
    }

    /// Builds every backend in `configs`, preserving order.
    ///
    /// # Errors
    ///
    /// Fails on the first entry [`build`](Self::build) rejects.
    pub fn build_all(&self, configs: &[BackendConfig]) -> Result<Vec<Arc<dyn DynProvider>>, LlmError> {
        configs
            .iter()
            .map(|config| self.build(config).map(Arc::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Provider;
    use crate::chat::{ChatMessage, ChatResponse};
    use crate::provider::ChatRequest;

    struct EchoModel {
        label: String,
    }

    impl Provider for EchoModel {
        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, LlmError> {
            Ok(ChatResponse::from_text(self.label.clone()))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct EchoFactory;

    impl BackendFactory for EchoFactory {
        fn name(&self) -> &str {
            "echo"
        }

        fn build(&self, config: &BackendConfig) -> Result<Box<dyn DynProvider>, LlmError> {
            if config.model.is_empty() {
                return Err(LlmError::Configuration("echo needs a model".into()));
            }
            Ok(Box::new(EchoModel {
                label: config.model.clone(),
            }))
        }
    }

    #[test]
    fn test_register_is_case_insensitive() {
        let mut registry = BackendRegistry::new();
        registry.register(Box::new(EchoFactory));
        assert!(registry.contains("echo"));
        assert!(registry.contains("ECHO"));
        assert_eq!(registry.backends(), vec!["echo"]);
    }

    #[test]
    fn test_unknown_backend_is_configuration_error() {
        let registry = BackendRegistry::new();
        let err = registry.build(&BackendConfig::new("nope", "m")).err().unwrap();
        assert!(matches!(err, LlmError::Configuration(ref msg) if msg.contains("nope")));
    }

    #[test]
    fn test_factory_errors_propagate() {
        let mut registry = BackendRegistry::new();
        registry.register(Box::new(EchoFactory));
        assert!(registry.build(&BackendConfig::new("echo", "")).is_err());
    }

    #[tokio::test]
    async fn test_build_all_preserves_order() {
        let mut registry = BackendRegistry::new();
        registry.register(Box::new(EchoFactory));

        let backends = registry
            .build_all(&[BackendConfig::new("echo", "first"), BackendConfig::new("Echo", "second")])
            .unwrap();
        assert_eq!(backends.len(), 2);

        let request = ChatRequest::new("m", vec![ChatMessage::user("hi")]).unwrap();
        assert_eq!(backends[0].chat_boxed(&request).await.unwrap().text(), "first");
        assert_eq!(backends[1].chat_boxed(&request).await.unwrap().text(), "second");
    }

    #[test]
    fn test_register_replaces_existing() {
        struct Other;
        impl BackendFactory for Other {
            fn name(&self) -> &str {
                "echo"
            }
            fn build(&self, _config: &BackendConfig) -> Result<Box<dyn DynProvider>, LlmError> {
                Err(LlmError::Configuration("replaced".into()))
            }
        }

        let mut registry = BackendRegistry::new();
        registry.register(Box::new(EchoFactory)).register(Box::new(Other));
        let err = registry.build(&BackendConfig::new("echo", "m")).err().unwrap();
        assert!(err.to_string().contains("replaced"));
    }
}
