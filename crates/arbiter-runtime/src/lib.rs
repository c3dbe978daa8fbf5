//! # arbiter-runtime
//!
//! The part of Arbiter that talks to a judge model.
//!
//! `arbiter-core` decides whether a reply is acceptable and what it scores.
//! This crate builds the request, sends it through a [`JudgeProvider`], and
//! hands the raw reply to the core. It never interprets the reply itself.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use arbiter_core::{Criterion, Rubric};
//! use arbiter_runtime::{AnthropicProvider, Judge};
//!
//! let rubric = Rubric::new(vec![
//!     Criterion::new("clarity", "Is the answer easy to follow?"),
//!     Criterion::new("correctness", "Are the claims accurate?"),
//! ])?;
//! let judge = Judge::new(Arc::new(AnthropicProvider::from_config(&serde_json::json!({}))?));
//!
//! let result = judge.evaluate("Water boils at 100C at sea level.", &rubric).await?;
//! println!("{:.2}: {}", result.score, result.rationale);
//! ```
//!
//! ## Features
//!
//! - `anthropic`: the Anthropic Messages API provider (pulls in `reqwest`)

pub mod config;
pub mod judge;
pub mod prompts;
pub mod providers;
pub mod retry;

pub use config::{ArbiterConfig, ConfigError, JudgeConfig, RetryPolicy};
pub use judge::Judge;
pub use providers::{
    ApiCredential, CompletionConfig, CredentialSource, JudgeProvider, ProviderError,
    ProviderFactory, ProviderRegistry, DEFAULT_MODEL,
};
pub use retry::evaluate_with_retry;

#[cfg(feature = "anthropic")]
pub use providers::{AnthropicProvider, AnthropicProviderFactory, ANTHROPIC_API_KEY_ENV};

use arbiter_core::EvaluationError;
use thiserror::Error;

/// Errors from a judge evaluation.
#[derive(Error, Debug)]
pub enum JudgeError {
    /// The model could not be reached or its response could not be read
    #[error("Judge provider failed: {0}")]
    Provider(#[from] ProviderError),

    /// The model answered but the reply was rejected
    #[error("Judge reply rejected: {0}")]
    Evaluation(#[from] EvaluationError),
}

impl JudgeError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            JudgeError::Provider(e) => e.is_transient(),
            JudgeError::Evaluation(_) => false,
        }
    }

    /// Short stage label for logs and reports.
    pub fn stage(&self) -> &'static str {
        match self {
            JudgeError::Provider(_) => "provider",
            JudgeError::Evaluation(e) => e.stage(),
        }
    }
}
