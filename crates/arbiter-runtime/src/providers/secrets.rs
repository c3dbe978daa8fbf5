//! Credential handling for judge providers.
//!
//! API keys are wrapped in [`ApiCredential`] as soon as they are read and are
//! only unwrapped at the point an HTTP header is set. `Debug` and `Display`
//! show where the key came from, never the key.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value as JsonValue;
use std::fmt;

use super::ProviderError;

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Provider JSON configuration
    Config,
    /// Environment variable (including one populated from `.env`)
    Environment,
    /// Passed in by code
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// An API key that cannot be logged by accident.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Load from `config[config_key]`, falling back to `env_var`.
    ///
    /// Config wins when both are set. An empty value from either place counts
    /// as unset, so a blank `ANTHROPIC_API_KEY=` line in `.env` is reported
    /// instead of producing an unauthenticated request.
    pub fn resolve(
        config: &JsonValue,
        config_key: &str,
        env_var: &str,
        name: &'static str,
    ) -> Result<Self, ProviderError> {
        if let Some(value) = config[config_key].as_str().filter(|v| !v.is_empty()) {
            return Ok(Self::new(value, CredentialSource::Config, name));
        }

        match std::env::var(env_var) {
            Ok(value) if !value.is_empty() => {
                Ok(Self::new(value, CredentialSource::Environment, name))
            }
            _ => Err(ProviderError::NotConfigured(format!(
                "{} required: set '{}' in config or the {} environment variable",
                name, config_key, env_var
            ))),
        }
    }

    /// Check whether [`ApiCredential::resolve`] would succeed.
    pub fn is_available(config: &JsonValue, config_key: &str, env_var: &str) -> bool {
        config[config_key].as_str().is_some_and(|v| !v.is_empty())
            || std::env::var(env_var).is_ok_and(|v| !v.is_empty())
    }

    /// Unwrap the key. Call only where the key is sent, never to store it.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "sk-ant-judge-secret-0001";

    #[test]
    fn test_redacted_everywhere() {
        let cred = ApiCredential::new(SECRET, CredentialSource::Config, "Judge key");

        let debug = format!("{:?}", cred);
        let display = format!("{}", cred);
        assert!(!debug.contains(SECRET));
        assert!(!display.contains(SECRET));
        assert!(debug.contains("[REDACTED]"));
        assert_eq!(display, "Judge key from config [REDACTED]");
        assert_eq!(cred.expose(), SECRET);
    }

    #[test]
    fn test_resolve_prefers_config() {
        std::env::set_var("ARBITER_TEST_KEY_PRIORITY", "env-key");
        let cred = ApiCredential::resolve(
            &serde_json::json!({"api_key": "config-key"}),
            "api_key",
            "ARBITER_TEST_KEY_PRIORITY",
            "Judge key",
        )
        .unwrap();
        std::env::remove_var("ARBITER_TEST_KEY_PRIORITY");

        assert_eq!(cred.expose(), "config-key");
        assert_eq!(cred.source(), CredentialSource::Config);
    }

    #[test]
    fn test_resolve_falls_back_to_env() {
        std::env::set_var("ARBITER_TEST_KEY_FALLBACK", "env-key");
        let cred = ApiCredential::resolve(
            &serde_json::json!({}),
            "api_key",
            "ARBITER_TEST_KEY_FALLBACK",
            "Judge key",
        )
        .unwrap();
        std::env::remove_var("ARBITER_TEST_KEY_FALLBACK");

        assert_eq!(cred.expose(), "env-key");
        assert_eq!(cred.source(), CredentialSource::Environment);
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        std::env::set_var("ARBITER_TEST_KEY_BLANK", "");
        let result = ApiCredential::resolve(
            &serde_json::json!({"api_key": ""}),
            "api_key",
            "ARBITER_TEST_KEY_BLANK",
            "Judge key",
        );
        assert!(!ApiCredential::is_available(
            &serde_json::json!({"api_key": ""}),
            "api_key",
            "ARBITER_TEST_KEY_BLANK"
        ));
        std::env::remove_var("ARBITER_TEST_KEY_BLANK");

        let message = result.unwrap_err().to_string();
        assert!(message.contains("Judge key"));
        assert!(message.contains("ARBITER_TEST_KEY_BLANK"));
    }

    #[test]
    fn test_is_available_from_config() {
        assert!(ApiCredential::is_available(
            &serde_json::json!({"api_key": "k"}),
            "api_key",
            "ARBITER_TEST_KEY_NEVER_SET"
        ));
        assert!(!ApiCredential::is_available(
            &serde_json::json!({}),
            "api_key",
            "ARBITER_TEST_KEY_NEVER_SET"
        ));
    }
}
