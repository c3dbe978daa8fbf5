//! Config-driven construction of judge providers.
//!
//! ```ignore
//! let registry = ProviderRegistry::with_defaults();
//! let provider = registry.create("anthropic", &serde_json::json!({"timeout": "45s"}))?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{JudgeProvider, ProviderError};

/// Builds one kind of judge provider from JSON configuration.
pub trait ProviderFactory: Send + Sync {
    /// Registry key, e.g. `"anthropic"`.
    fn provider_type(&self) -> &'static str;

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn JudgeProvider>, ProviderError>;

    /// Check configuration without building a provider or touching the network.
    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError>;

    fn default_config(&self) -> JsonValue {
        serde_json::json!({})
    }

    fn description(&self) -> &'static str {
        "Judge provider"
    }
}

/// Provider factories keyed by type name.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any with the same type name.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories
            .insert(factory.provider_type().to_string(), factory);
    }

    fn factory(&self, provider_type: &str) -> Result<&Arc<dyn ProviderFactory>, ProviderError> {
        self.factories.get(provider_type).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider type: '{}'. Available: {:?}",
                provider_type,
                self.available_types()
            ))
        })
    }

    pub fn create(
        &self,
        provider_type: &str,
        config: &JsonValue,
    ) -> Result<Arc<dyn JudgeProvider>, ProviderError> {
        let factory = self.factory(provider_type)?;
        factory.validate_config(config)?;
        let provider = factory.create(config)?;
        tracing::debug!(provider = provider_type, "Created judge provider");
        Ok(provider)
    }

    pub fn validate(&self, provider_type: &str, config: &JsonValue) -> Result<(), ProviderError> {
        self.factory(provider_type)?.validate_config(config)
    }

    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    pub fn has_provider(&self, provider_type: &str) -> bool {
        self.factories.contains_key(provider_type)
    }

    pub fn default_config(&self, provider_type: &str) -> Option<JsonValue> {
        self.factories
            .get(provider_type)
            .map(|f| f.default_config())
    }

    /// Registry with every provider compiled into this build.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "anthropic")]
        registry.register(Arc::new(super::AnthropicProviderFactory));
        registry
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::{JudgmentRequest, RawReplyEnvelope};
    use async_trait::async_trait;

    struct CannedProvider {
        reply: String,
    }

    #[async_trait]
    impl JudgeProvider for CannedProvider {
        async fn invoke(
            &self,
            _request: &JudgmentRequest,
        ) -> Result<RawReplyEnvelope, ProviderError> {
            Ok(RawReplyEnvelope::text(self.reply.clone()))
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    struct CannedFactory;

    impl ProviderFactory for CannedFactory {
        fn provider_type(&self) -> &'static str {
            "canned"
        }

        fn create(&self, config: &JsonValue) -> Result<Arc<dyn JudgeProvider>, ProviderError> {
            Ok(Arc::new(CannedProvider {
                reply: config["reply"].as_str().unwrap_or("{}").to_string(),
            }))
        }

        fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
            match &config["reply"] {
                JsonValue::Null | JsonValue::String(_) => Ok(()),
                _ => Err(ProviderError::NotConfigured(
                    "reply must be a string".to_string(),
                )),
            }
        }

        fn default_config(&self) -> JsonValue {
            serde_json::json!({"reply": "{}"})
        }
    }

    fn registry() -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(CannedFactory));
        registry
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = registry();
        assert!(registry.has_provider("canned"));
        assert!(!registry.has_provider("openai"));
        assert_eq!(registry.available_types(), vec!["canned"]);
        assert_eq!(
            registry.default_config("canned"),
            Some(serde_json::json!({"reply": "{}"}))
        );
    }

    #[tokio::test]
    async fn test_create_uses_config() {
        let provider = registry()
            .create("canned", &serde_json::json!({"reply": "{\"a\": 1}"}))
            .unwrap();
        assert_eq!(provider.name(), "canned");
        assert!(provider.health_check().await);
    }

    #[test]
    fn test_create_validates_first() {
        let result = registry().create("canned", &serde_json::json!({"reply": 5}));
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn test_unknown_type_lists_available() {
        let err = registry()
            .create("openai", &serde_json::json!({}))
            .err()
            .unwrap();
        let message = err.to_string();
        assert!(message.contains("openai"));
        assert!(message.contains("canned"));
    }

    #[cfg(feature = "anthropic")]
    #[test]
    fn test_defaults_include_anthropic() {
        assert!(ProviderRegistry::with_defaults().has_provider("anthropic"));
    }
}
