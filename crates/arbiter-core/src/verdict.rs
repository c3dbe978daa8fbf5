//! Parsing and validating the judge's structured verdict.
//!
//! The reply text must be a single JSON object with one numeric key per
//! rubric criterion and an optional `rationale` string. Unknown keys are
//! ignored so that judges may add fields without breaking older rubrics.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use thiserror::Error;

use crate::rubric::Rubric;
use crate::EvaluationError;

/// Key of the free-text explanation in the verdict object.
pub const RATIONALE_KEY: &str = "rationale";

/// Maximum characters of offending reply text kept in diagnostics.
pub const EXCERPT_LIMIT: usize = 200;

/// The reply text is not a JSON object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Judge reply is not a verdict object: {reason} (reply: {excerpt:?})")]
pub struct VerdictFormatError {
    /// Offending text, truncated to [`EXCERPT_LIMIT`] characters
    pub excerpt: String,

    /// Why parsing failed
    pub reason: String,
}

impl VerdictFormatError {
    fn new(text: &str, reason: impl Into<String>) -> Self {
        Self {
            excerpt: excerpt(text),
            reason: reason.into(),
        }
    }
}

/// What is wrong with a single verdict field.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentProblem {
    /// Criterion key absent from the verdict
    Missing,
    /// Criterion present but not a JSON number
    NotNumeric { found: &'static str },
    /// Numeric score outside `[0, max]`
    OutOfRange { score: f64, max: f64 },
    /// Rationale present but not a string
    RationaleNotText { found: &'static str },
}

impl fmt::Display for ContentProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentProblem::Missing => write!(f, "missing from verdict"),
            ContentProblem::NotNumeric { found } => {
                write!(f, "expected a number, found {}", found)
            }
            ContentProblem::OutOfRange { score, max } => {
                write!(f, "score {} is outside [0, {}]", score, max)
            }
            ContentProblem::RationaleNotText { found } => {
                write!(f, "expected a string, found {}", found)
            }
        }
    }
}

/// The verdict object parsed but does not satisfy the rubric.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Verdict rejected for '{criterion}': {problem}")]
pub struct VerdictContentError {
    /// Offending criterion (or `rationale`)
    pub criterion: String,

    pub problem: ContentProblem,
}

/// A single validated criterion score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion: String,
    pub score: f64,
}

/// The judge's validated scoring.
///
/// Scores are stored in rubric order, whatever order the judge used.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    scores: Vec<CriterionScore>,
    rationale: String,
}

impl Verdict {
    pub(crate) fn new(scores: Vec<CriterionScore>, rationale: String) -> Self {
        Self { scores, rationale }
    }

    /// Scores in rubric order.
    pub fn scores(&self) -> &[CriterionScore] {
        &self.scores
    }

    /// Score for one criterion.
    pub fn score(&self, criterion: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.criterion == criterion)
            .map(|s| s.score)
    }

    /// Rationale text; empty when the judge gave none.
    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    pub fn into_parts(self) -> (Vec<CriterionScore>, String) {
        (self.scores, self.rationale)
    }
}

/// Parse reply text into a verdict and validate it against the rubric.
///
/// # Errors
///
/// * [`EvaluationError::VerdictFormat`] if the text is not a JSON object
/// * [`EvaluationError::VerdictContent`] for the first criterion (in rubric
///   order) that is missing, non-numeric or out of range, or for a
///   non-string rationale
pub fn parse_verdict(text: &str, rubric: &Rubric) -> Result<Verdict, EvaluationError> {
    let value: JsonValue = serde_json::from_str(text)
        .map_err(|e| VerdictFormatError::new(text, e.to_string()))?;

    let fields = match value {
        JsonValue::Object(fields) => fields,
        other => {
            return Err(VerdictFormatError::new(
                text,
                format!("expected a JSON object, found {}", json_type(&other)),
            )
            .into());
        }
    };

    let mut scores = Vec::with_capacity(rubric.len());
    for criterion in rubric.criteria() {
        let problem = match fields.get(&criterion.name) {
            None => Some(ContentProblem::Missing),
            Some(JsonValue::Number(n)) => match n.as_f64() {
                Some(score) if (0.0..=criterion.max_score).contains(&score) => {
                    scores.push(CriterionScore {
                        criterion: criterion.name.clone(),
                        score,
                    });
                    None
                }
                Some(score) => Some(ContentProblem::OutOfRange {
                    score,
                    max: criterion.max_score,
                }),
                None => Some(ContentProblem::NotNumeric { found: "number" }),
            },
            Some(other) => Some(ContentProblem::NotNumeric {
                found: json_type(other),
            }),
        };

        if let Some(problem) = problem {
            return Err(VerdictContentError {
                criterion: criterion.name.clone(),
                problem,
            }
            .into());
        }
    }

    let rationale = match fields.get(RATIONALE_KEY) {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => {
            return Err(VerdictContentError {
                criterion: RATIONALE_KEY.to_string(),
                problem: ContentProblem::RationaleNotText {
                    found: json_type(other),
                },
            }
            .into());
        }
    };

    Ok(Verdict::new(scores, rationale))
}

fn json_type(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Truncate on a character boundary for diagnostics.
fn excerpt(text: &str) -> String {
    match text.char_indices().nth(EXCERPT_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
