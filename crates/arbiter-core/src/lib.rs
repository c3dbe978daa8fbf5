//! # arbiter-core
//!
//! Deterministic half of Arbiter's LLM-as-judge evaluation.
//!
//! A judge model is asked to score some content against a rubric. This crate
//! owns everything that happens after the judge answers:
//! - Is the reply shaped the way the protocol demands?
//! - Does it parse into a verdict that covers every criterion?
//! - What single score does that verdict reduce to?
//!
//! ## Key Guarantees
//!
//! 1. **No model calls**: given the same reply, the same result comes back
//! 2. **Fail-fast**: the first violated gate is reported, never a partial score
//! 3. **Diagnosable**: every error names what was expected and what was found
//!
//! ## Example
//!
//! ```rust
//! use arbiter_core::{
//!     score_reply, Criterion, GenerationConstraints, JudgmentRequest, RawReplyEnvelope, Rubric,
//! };
//!
//! let rubric = Rubric::new(vec![
//!     Criterion::new("clarity", "Is the answer easy to follow?"),
//!     Criterion::new("correctness", "Are the claims accurate?"),
//! ])?;
//! let request = JudgmentRequest::new(
//!     "Water boils at 100C at sea level.",
//!     rubric,
//!     "You are a strict grader.",
//!     "Score the content.",
//!     GenerationConstraints::default(),
//! );
//!
//! let reply = RawReplyEnvelope::text(r#"{"clarity": 8, "correctness": 6, "rationale": "ok"}"#);
//! let result = score_reply(&reply, &request)?;
//! assert_eq!(result.score, 7.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod aggregator;
pub mod envelope;
pub mod protocol;
pub mod rubric;
pub mod types;
pub mod validator;
pub mod verdict;

// Re-export main types at crate root
pub use aggregator::{aggregate, mean, weighted_mean};
pub use envelope::{ContentItem, ContentKind, RawReplyEnvelope, TokenUsage};
pub use protocol::score_reply;
pub use rubric::{Criterion, Rubric, RubricConfigError, RubricError};
pub use types::{EvaluationResult, GenerationConstraints, JudgmentRequest};
pub use validator::{extract_text, ContentShapeError};
pub use verdict::{
    parse_verdict, ContentProblem, CriterionScore, Verdict, VerdictContentError,
    VerdictFormatError,
};

use thiserror::Error;

/// Errors that can occur while scoring a judge reply.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error(transparent)]
    ContentShape(#[from] ContentShapeError),

    #[error(transparent)]
    VerdictFormat(#[from] VerdictFormatError),

    #[error(transparent)]
    VerdictContent(#[from] VerdictContentError),

    #[error(transparent)]
    RubricConfig(#[from] RubricConfigError),
}

impl EvaluationError {
    /// Short stage label for logs and reports.
    pub fn stage(&self) -> &'static str {
        match self {
            EvaluationError::ContentShape(_) => "content_shape",
            EvaluationError::VerdictFormat(_) => "verdict_format",
            EvaluationError::VerdictContent(_) => "verdict_content",
            EvaluationError::RubricConfig(_) => "rubric_config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        let err: EvaluationError = ContentShapeError {
            expected: ContentKind::Text,
            found: None,
        }
        .into();
        assert_eq!(err.stage(), "content_shape");

        let err: EvaluationError = RubricConfigError::Empty.into();
        assert_eq!(err.stage(), "rubric_config");
    }

    #[test]
    fn test_error_messages_are_transparent() {
        let err: EvaluationError = VerdictContentError {
            criterion: "correctness".into(),
            problem: ContentProblem::Missing,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Verdict rejected for 'correctness': missing from verdict"
        );
    }
}
