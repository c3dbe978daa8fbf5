//! Aggregator: reduces per-criterion scores to one score.
//!
//! The rule is fixed:
//! 1. Unweighted rubric → arithmetic mean of the scores
//! 2. Weighted rubric → `Σ(score × weight) / Σ(weight)`
//!
//! Scores are summed in rubric order and the result is never rounded.
//! Display rounding belongs to whoever prints the number.

use crate::rubric::{Rubric, RubricConfigError};
use crate::verdict::{ContentProblem, Verdict, VerdictContentError};
use crate::EvaluationError;

/// Reduce a verdict to a single score on the rubric's scale.
pub fn aggregate(verdict: &Verdict, rubric: &Rubric) -> Result<f64, EvaluationError> {
    let mut scores = Vec::with_capacity(rubric.len());
    for criterion in rubric.criteria() {
        let score = verdict
            .score(&criterion.name)
            .ok_or_else(|| VerdictContentError {
                criterion: criterion.name.clone(),
                problem: ContentProblem::Missing,
            })?;
        scores.push((score, criterion.weight));
    }

    let score = if rubric.is_weighted() {
        let mut pairs = Vec::with_capacity(scores.len());
        for ((score, weight), criterion) in scores.iter().zip(rubric.criteria()) {
            let weight = weight.ok_or_else(|| RubricConfigError::PartialWeights {
                criterion: criterion.name.clone(),
            })?;
            pairs.push((*score, weight));
        }
        weighted_mean(&pairs)?
    } else {
        let plain: Vec<f64> = scores.iter().map(|(score, _)| *score).collect();
        let score = mean(&plain).ok_or(RubricConfigError::Empty)?;
        if !score.is_finite() {
            return Err(RubricConfigError::NonFiniteTotal {
                quantity: "score total",
                value: score,
            }
            .into());
        }
        score
    };

    tracing::debug!(
        criteria = rubric.len(),
        weighted = rubric.is_weighted(),
        score,
        "Aggregated verdict"
    );

    Ok(score)
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Weighted mean of `(score, weight)` pairs.
///
/// # Errors
///
/// [`RubricConfigError::NonPositiveWeightTotal`] when the weights do not add
/// up to a positive number (including the empty case), and
/// [`RubricConfigError::NonFiniteTotal`] when either sum overflows.
pub fn weighted_mean(pairs: &[(f64, f64)]) -> Result<f64, RubricConfigError> {
    let total: f64 = pairs.iter().map(|(_, weight)| weight).sum();
    if total.is_nan() || total <= 0.0 {
        return Err(RubricConfigError::NonPositiveWeightTotal { total });
    }
    if !total.is_finite() {
        return Err(RubricConfigError::NonFiniteTotal {
            quantity: "weight total",
            value: total,
        });
    }

    let weighted: f64 = pairs.iter().map(|(score, weight)| score * weight).sum();
    if !weighted.is_finite() {
        return Err(RubricConfigError::NonFiniteTotal {
            quantity: "weighted score total",
            value: weighted,
        });
    }
    Ok(weighted / total)
}
