//! Caller-level retry around [`Judge::evaluate`].
//!
//! Only transient provider failures are retried. A reply that reached the
//! judge and was rejected is a verdict about the model's output, so sending
//! the same request again is left to the caller's judgment.

use std::time::Duration;

use arbiter_core::{EvaluationResult, Rubric};
use backon::{ExponentialBuilder, Retryable};

use crate::config::RetryPolicy;
use crate::judge::Judge;
use crate::JudgeError;

fn backoff(policy: &RetryPolicy) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(policy.min_delay)
        .with_max_delay(policy.max_delay)
        .with_max_times(policy.max_retries)
        .with_jitter()
}

/// Evaluate with exponential backoff on transient provider errors.
pub async fn evaluate_with_retry(
    judge: &Judge,
    content: &str,
    rubric: &Rubric,
    policy: &RetryPolicy,
) -> Result<EvaluationResult, JudgeError> {
    let request = judge.build_request(content, rubric);
    let request = &request;

    (|| async move { judge.evaluate_request(request).await })
        .retry(backoff(policy))
        .when(JudgeError::is_transient)
        .notify(|err: &JudgeError, delay: Duration| {
            tracing::warn!(
                error = %err,
                delay = %humantime::format_duration(delay),
                "Retrying evaluation after transient failure"
            );
        })
        .await
}
