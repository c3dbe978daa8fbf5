//! The judge: one model call, then the deterministic scoring pipeline.

use std::sync::Arc;

use arbiter_core::{score_reply, EvaluationResult, JudgmentRequest, Rubric};

use crate::config::JudgeConfig;
use crate::prompts::render_prompt;
use crate::providers::JudgeProvider;
use crate::JudgeError;

/// Scores content against a rubric using a judge provider.
///
/// Each evaluation invokes the provider exactly once. A reply that fails any
/// gate is returned as an error; there is no internal retry and no partial
/// score.
pub struct Judge {
    provider: Arc<dyn JudgeProvider>,
    config: JudgeConfig,
}

impl std::fmt::Debug for Judge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Judge")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Judge {
    pub fn new(provider: Arc<dyn JudgeProvider>) -> Self {
        Self {
            provider,
            config: JudgeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: JudgeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Build the request [`Judge::evaluate`] would send, without sending it.
    pub fn build_request(&self, content: &str, rubric: &Rubric) -> JudgmentRequest {
        let constraints = self.config.constraints.clone();
        let prompt = render_prompt(rubric, content, &constraints);
        JudgmentRequest::new(
            content,
            rubric.clone(),
            self.config.system_prompt.clone(),
            prompt,
            constraints,
        )
    }

    /// Evaluate `content` against `rubric`.
    pub async fn evaluate(
        &self,
        content: &str,
        rubric: &Rubric,
    ) -> Result<EvaluationResult, JudgeError> {
        let request = self.build_request(content, rubric);
        self.evaluate_request(&request).await
    }

    /// Evaluate a request that was built ahead of time.
    pub async fn evaluate_request(
        &self,
        request: &JudgmentRequest,
    ) -> Result<EvaluationResult, JudgeError> {
        let provider = self.provider.name();
        tracing::info!(
            provider,
            criteria = request.rubric().len(),
            content_chars = request.content().chars().count(),
            "Starting evaluation"
        );

        let envelope = self.provider.invoke(request).await.map_err(|e| {
            tracing::warn!(provider, error = %e, transient = e.is_transient(), "Judge call failed");
            JudgeError::Provider(e)
        })?;

        if envelope.hit_token_limit() {
            tracing::warn!(
                provider,
                max_tokens = request.constraints().max_tokens,
                "Judge reply was cut off by the token limit"
            );
        }

        let result = score_reply(&envelope, request).map_err(|e| {
            tracing::warn!(provider, stage = e.stage(), error = %e, "Judge reply rejected");
            JudgeError::Evaluation(e)
        })?;

        tracing::info!(
            provider,
            score = result.score,
            total_tokens = envelope.usage.total(),
            "Evaluation complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::{Criterion, RawReplyEnvelope};
    use async_trait::async_trait;

    use crate::providers::ProviderError;

    struct EchoRequest;

    #[async_trait]
    impl JudgeProvider for EchoRequest {
        async fn invoke(
            &self,
            request: &JudgmentRequest,
        ) -> Result<RawReplyEnvelope, ProviderError> {
            // Score every criterion at half its maximum
            let mut verdict = serde_json::Map::new();
            for c in request.rubric().criteria() {
                verdict.insert(c.name.clone(), serde_json::json!(c.max_score / 2.0));
            }
            Ok(RawReplyEnvelope::text(
                serde_json::Value::Object(verdict).to_string(),
            ))
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn rubric() -> Rubric {
        Rubric::new(vec![
            Criterion::new("clarity", "Easy to follow").with_max_score(4.0),
            Criterion::new("depth", "Goes beyond the obvious").with_max_score(4.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_build_request_uses_config() {
        let mut config = JudgeConfig::default();
        config.system_prompt = "Be terse.".to_string();
        config.constraints.max_tokens = 256;
        let judge = Judge::new(Arc::new(EchoRequest)).with_config(config);

        let request = judge.build_request("some text", &rubric());
        assert_eq!(request.content(), "some text");
        assert_eq!(request.system_prompt(), "Be terse.");
        assert_eq!(request.constraints().max_tokens, 256);
        assert!(request.prompt().contains("some text"));
        assert_eq!(request.rubric(), &rubric());
    }

    #[tokio::test]
    async fn test_evaluate_uses_request_rubric() {
        let judge = Judge::new(Arc::new(EchoRequest));
        let result = judge.evaluate("text", &rubric()).await.unwrap();
        // (2 + 2) / 2
        assert_eq!(result.score, 2.0);
        assert_eq!(result.rationale, "");
    }

    #[test]
    fn test_debug_shows_provider_name() {
        let judge = Judge::new(Arc::new(EchoRequest));
        assert!(format!("{:?}", judge).contains("\"echo\""));
        assert_eq!(judge.provider_name(), "echo");
    }
}
