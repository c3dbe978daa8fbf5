//! Runtime configuration.
//!
//! A config file is JSON. Every section is optional:
//!
//! ```json
//! {
//!   "provider": "anthropic",
//!   "provider_config": {"model": "claude-haiku-4-5-20251001", "timeout": "30s"},
//!   "judge": {
//!     "constraints": {"opening_marker": "<verdict>", "closing_marker": "</verdict>", "max_tokens": 8000},
//!     "retry": {"max_retries": 2, "min_delay": "1s", "max_delay": "20s"}
//!   }
//! }
//! ```
//!
//! Durations are written the way people say them (`"500ms"`, `"1m 30s"`).

use std::path::Path;
use std::time::Duration;

use arbiter_core::GenerationConstraints;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::prompts::JUDGE_SYSTEM_PROMPT;

/// Errors loading or checking configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

mod duration_human {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

/// Caller-level retry policy for transient provider failures.
///
/// The judge itself never retries; see [`crate::retry::evaluate_with_retry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts after the first; 0 disables retrying
    pub max_retries: usize,

    /// Delay before the first retry
    #[serde(with = "duration_human")]
    pub min_delay: Duration,

    /// Upper bound on any single delay
    #[serde(with = "duration_human")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(20),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

/// Settings for a [`crate::Judge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    /// System prompt sent with every request
    pub system_prompt: String,

    /// Markers and token budget for the reply
    pub constraints: GenerationConstraints,

    pub retry: RetryPolicy,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            system_prompt: JUDGE_SYSTEM_PROMPT.to_string(),
            constraints: GenerationConstraints::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl JudgeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.constraints.max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "constraints.max_tokens must be at least 1".to_string(),
            ));
        }
        if !self.constraints.opening_marker.is_empty()
            && self.constraints.opening_marker == self.constraints.closing_marker
        {
            return Err(ConfigError::Invalid(format!(
                "opening and closing markers must differ, both are '{}'",
                self.constraints.opening_marker
            )));
        }
        if self.retry.max_delay < self.retry.min_delay {
            return Err(ConfigError::Invalid(format!(
                "retry.max_delay ({}) is shorter than retry.min_delay ({})",
                humantime::format_duration(self.retry.max_delay),
                humantime::format_duration(self.retry.min_delay)
            )));
        }
        Ok(())
    }
}

fn default_provider() -> String {
    "anthropic".to_string()
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbiterConfig {
    /// Registry key of the judge provider
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Passed verbatim to the provider factory
    #[serde(default = "empty_object")]
    pub provider_config: JsonValue,

    #[serde(default)]
    pub judge: JudgeConfig,
}

fn empty_object() -> JsonValue {
    JsonValue::Object(Default::default())
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            provider_config: empty_object(),
            judge: JudgeConfig::default(),
        }
    }
}

impl ArbiterConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.provider_config.is_object() {
            return Err(ConfigError::Invalid(
                "provider_config must be a JSON object".to_string(),
            ));
        }
        self.judge.validate()
    }
}
