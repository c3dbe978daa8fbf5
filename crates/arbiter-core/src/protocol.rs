//! The deterministic half of an evaluation: reply in, score out.
//!
//! `score_reply` runs the three gates in a fixed order and stops at the first
//! failure. It makes no model calls, so the same envelope and request always
//! produce the same result.

use crate::aggregator::aggregate;
use crate::envelope::RawReplyEnvelope;
use crate::types::{EvaluationResult, JudgmentRequest};
use crate::validator::extract_text;
use crate::verdict::parse_verdict;
use crate::EvaluationError;

/// Validate a judge reply and reduce it to an [`EvaluationResult`].
///
/// # Execution Flow
/// 1. Reply shape: the first item must be plain text
/// 2. Fragment: text between the request's markers
/// 3. Verdict: JSON object satisfying the rubric
/// 4. Aggregate: mean (or weighted mean) of the scores
pub fn score_reply(
    envelope: &RawReplyEnvelope,
    request: &JudgmentRequest,
) -> Result<EvaluationResult, EvaluationError> {
    let text = extract_text(envelope)?;
    let fragment = request.constraints().isolate_fragment(text);
    let verdict = parse_verdict(fragment, request.rubric())?;
    let score = aggregate(&verdict, request.rubric())?;

    let (scores, rationale) = verdict.into_parts();
    Ok(EvaluationResult {
        score,
        rationale,
        scores,
    })
}
