//! Rubric parsing from YAML/JSON.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::verdict::RATIONALE_KEY;

/// Score ceiling used when a criterion does not declare one.
pub const DEFAULT_MAX_SCORE: f64 = 10.0;

lazy_static! {
    /// Criterion names double as JSON keys in the verdict.
    static ref CRITERION_NAME_PATTERN: Regex =
        Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").unwrap();
}

/// A rubric that is internally inconsistent.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RubricConfigError {
    #[error("Rubric has no criteria")]
    Empty,

    #[error("Invalid criterion name '{name}': must match ^[A-Za-z][A-Za-z0-9_-]*$")]
    InvalidName { name: String },

    #[error("Criterion name '{name}' is reserved for the verdict rationale")]
    ReservedName { name: String },

    #[error("Duplicate criterion name: {name}")]
    DuplicateName { name: String },

    #[error("Criterion '{criterion}' has invalid max_score {max_score}: must be finite and positive")]
    InvalidMaxScore { criterion: String, max_score: f64 },

    #[error("Criterion '{criterion}' has invalid weight {weight}: must be finite and non-negative")]
    InvalidWeight { criterion: String, weight: f64 },

    #[error("Criterion '{criterion}' has no weight while other criteria are weighted")]
    PartialWeights { criterion: String },

    #[error("Criterion '{criterion}' has max_score {max_score} but the rubric scale is {expected}")]
    MixedMaxScore {
        criterion: String,
        max_score: f64,
        expected: f64,
    },

    #[error("Criterion weights must sum to a positive total, got {total}")]
    NonPositiveWeightTotal { total: f64 },

    #[error("Rubric {quantity} is not finite ({value})")]
    NonFiniteTotal { quantity: &'static str, value: f64 },
}

/// Errors that can occur when loading rubric documents.
#[derive(Error, Debug)]
pub enum RubricError {
    #[error("Failed to read rubric file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Rubric does not match schema: {}", .0.join("; "))]
    SchemaError(Vec<String>),

    #[error("Invalid rubric: {0}")]
    Config(#[from] RubricConfigError),
}

/// A single named criterion the judge scores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Criterion {
    /// Key the judge must use for this criterion's score
    pub name: String,

    /// What the judge should look for
    #[serde(default)]
    pub description: String,

    /// Inclusive upper bound of the score range `[0, max_score]`
    #[serde(default = "default_max_score")]
    pub max_score: f64,

    /// Relative weight in the aggregate; all-or-none across a rubric
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

fn default_max_score() -> f64 {
    DEFAULT_MAX_SCORE
}

impl Criterion {
    /// Create an unweighted criterion scored on `[0, 10]`.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            max_score: DEFAULT_MAX_SCORE,
            weight: None,
        }
    }

    pub fn with_max_score(mut self, max_score: f64) -> Self {
        self.max_score = max_score;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

/// Serialized form of a rubric, before consistency checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RubricDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    criteria: Vec<Criterion>,
}

/// An ordered, validated set of criteria.
///
/// A `Rubric` can only be obtained through [`Rubric::new`] or the document
/// loaders, so every instance satisfies the consistency rules: at least one
/// criterion, unique well-formed names, one positive finite `max_score`
/// shared by all criteria, and weights either absent everywhere or present
/// everywhere with a positive finite total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RubricDocument", into = "RubricDocument")]
pub struct Rubric {
    name: Option<String>,
    description: Option<String>,
    criteria: Vec<Criterion>,
}

impl TryFrom<RubricDocument> for Rubric {
    type Error = RubricConfigError;

    fn try_from(doc: RubricDocument) -> Result<Self, Self::Error> {
        let mut rubric = Rubric::new(doc.criteria)?;
        rubric.name = doc.name;
        rubric.description = doc.description;
        Ok(rubric)
    }
}

impl From<Rubric> for RubricDocument {
    fn from(rubric: Rubric) -> Self {
        Self {
            name: rubric.name,
            description: rubric.description,
            criteria: rubric.criteria,
        }
    }
}

impl Rubric {
    /// Build a rubric from criteria in the order they should be judged.
    pub fn new(criteria: Vec<Criterion>) -> Result<Self, RubricConfigError> {
        let rubric = Self {
            name: None,
            description: None,
            criteria,
        };
        rubric.validate()?;
        Ok(rubric)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parse a rubric from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, RubricError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a rubric from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, RubricError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Load a rubric file, choosing the format by extension (`.json` is JSON,
    /// anything else is read as YAML).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RubricError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(&contents)
        } else {
            Self::from_yaml(&contents)
        }
    }

    fn from_value(value: serde_json::Value) -> Result<Self, RubricError> {
        super::schema::validate_rubric_schema(&value).map_err(RubricError::SchemaError)?;
        let doc: RubricDocument = serde_json::from_value(value)?;
        Ok(Rubric::try_from(doc)?)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Criteria in declared order.
    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    /// Look up a criterion by name.
    pub fn criterion(&self, name: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// The shared score ceiling of every criterion, which is also the scale
    /// of the aggregate score.
    pub fn max_score(&self) -> f64 {
        self.criteria
            .first()
            .map(|c| c.max_score)
            .unwrap_or(DEFAULT_MAX_SCORE)
    }

    /// Whether the aggregate is a weighted mean.
    pub fn is_weighted(&self) -> bool {
        self.criteria.iter().any(|c| c.weight.is_some())
    }

    /// Validate the rubric structure.
    fn validate(&self) -> Result<(), RubricConfigError> {
        if self.criteria.is_empty() {
            return Err(RubricConfigError::Empty);
        }

        let mut seen = HashSet::new();
        for criterion in &self.criteria {
            if !CRITERION_NAME_PATTERN.is_match(&criterion.name) {
                return Err(RubricConfigError::InvalidName {
                    name: criterion.name.clone(),
                });
            }
            if criterion.name == RATIONALE_KEY {
                return Err(RubricConfigError::ReservedName {
                    name: criterion.name.clone(),
                });
            }
            if !seen.insert(criterion.name.as_str()) {
                return Err(RubricConfigError::DuplicateName {
                    name: criterion.name.clone(),
                });
            }
            if !criterion.max_score.is_finite() || criterion.max_score <= 0.0 {
                return Err(RubricConfigError::InvalidMaxScore {
                    criterion: criterion.name.clone(),
                    max_score: criterion.max_score,
                });
            }
            if criterion.max_score != self.max_score() {
                return Err(RubricConfigError::MixedMaxScore {
                    criterion: criterion.name.clone(),
                    max_score: criterion.max_score,
                    expected: self.max_score(),
                });
            }
        }

        // Every score is at most max_score, so a finite ceiling sum keeps the
        // plain mean finite.
        let ceiling = self.max_score() * self.criteria.len() as f64;
        if !ceiling.is_finite() {
            return Err(RubricConfigError::NonFiniteTotal {
                quantity: "score total",
                value: ceiling,
            });
        }

        self.validate_weights()
    }

    fn validate_weights(&self) -> Result<(), RubricConfigError> {
        if !self.is_weighted() {
            return Ok(());
        }

        let mut total = 0.0;
        for criterion in &self.criteria {
            let weight = criterion
                .weight
                .ok_or_else(|| RubricConfigError::PartialWeights {
                    criterion: criterion.name.clone(),
                })?;
            if !weight.is_finite() || weight < 0.0 {
                return Err(RubricConfigError::InvalidWeight {
                    criterion: criterion.name.clone(),
                    weight,
                });
            }
            total += weight;
        }

        if !total.is_finite() {
            return Err(RubricConfigError::NonFiniteTotal {
                quantity: "weight total",
                value: total,
            });
        }
        if total <= 0.0 {
            return Err(RubricConfigError::NonPositiveWeightTotal { total });
        }

        let weighted_ceiling = total * self.max_score();
        if !weighted_ceiling.is_finite() {
            return Err(RubricConfigError::NonFiniteTotal {
                quantity: "weighted score total",
                value: weighted_ceiling,
            });
        }

        Ok(())
    }
}
