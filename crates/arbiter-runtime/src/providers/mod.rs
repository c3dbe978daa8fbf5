//! Judge providers: the only place a model is called.
//!
//! A provider turns a [`JudgmentRequest`] into a [`RawReplyEnvelope`] and
//! nothing more. It does not interpret the reply, retry, or cache; those are
//! the judge's and the caller's concerns.
//!
//! ## Security
//!
//! Providers hold credentials through [`secrets::ApiCredential`], which never
//! renders its value in `Debug` or `Display` output.

use arbiter_core::{JudgmentRequest, RawReplyEnvelope};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;

mod factory;
pub mod secrets;

#[cfg(feature = "anthropic")]
mod anthropic;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicProvider, AnthropicProviderFactory, ANTHROPIC_API_KEY_ENV};

/// Model used when configuration does not name one.
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

/// Errors from judge providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Unreadable provider response: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Whether a later identical call might succeed.
    ///
    /// Only transport and capacity failures qualify. A response the provider
    /// could not read, or bad credentials, will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::HttpError(_)
            | ProviderError::RateLimited { .. }
            | ProviderError::Timeout(_) => true,
            ProviderError::ApiError { status, .. } => *status >= 500,
            ProviderError::ParseError(_)
            | ProviderError::AuthError
            | ProviderError::NotConfigured(_) => false,
        }
    }
}

/// Model selection and transport settings for a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    /// Model to use
    pub model: String,

    /// Temperature (0.0 for deterministic)
    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            timeout: Duration::from_secs(30),
        }
    }
}

impl CompletionConfig {
    /// Read `model`, `temperature` and `timeout` from provider JSON config,
    /// keeping defaults for absent keys. `timeout` is a human-readable
    /// duration such as `"45s"` or `"2m"`.
    pub fn from_json(config: &JsonValue) -> Result<Self, ProviderError> {
        let mut settings = Self::default();

        if let Some(model) = config["model"].as_str() {
            settings.model = model.to_string();
        }

        match &config["temperature"] {
            JsonValue::Null => {}
            value => {
                let temperature = value
                    .as_f64()
                    .filter(|t| (0.0..=1.0).contains(t))
                    .ok_or_else(|| {
                        ProviderError::NotConfigured(format!(
                            "temperature must be a number in [0, 1], got {}",
                            value
                        ))
                    })?;
                settings.temperature = temperature as f32;
            }
        }

        match &config["timeout"] {
            JsonValue::Null => {}
            JsonValue::String(raw) => {
                settings.timeout = humantime::parse_duration(raw).map_err(|e| {
                    ProviderError::NotConfigured(format!("invalid timeout '{}': {}", raw, e))
                })?;
            }
            other => {
                return Err(ProviderError::NotConfigured(format!(
                    "timeout must be a duration string like \"30s\", got {}",
                    other
                )));
            }
        }

        Ok(settings)
    }
}

/// Provider abstraction allows swapping judge backends.
#[async_trait]
pub trait JudgeProvider: Send + Sync {
    /// Send one judgment request and return the raw reply.
    ///
    /// Implementations must honour the request's generation constraints:
    /// prefill the opening marker, stop at the closing marker, and cap
    /// output at `max_tokens`.
    async fn invoke(&self, request: &JudgmentRequest) -> Result<RawReplyEnvelope, ProviderError>;

    /// Check if provider is usable.
    async fn health_check(&self) -> bool;

    /// Get provider name for logs.
    fn name(&self) -> &str;

    /// Estimate tokens for a prompt.
    fn estimate_tokens(&self, text: &str) -> u32 {
        // ~4 chars per token
        (text.len() / 4) as u32
    }
}
