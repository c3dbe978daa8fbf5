//! Request and result types shared by the core and the runtime.

use serde::{Deserialize, Serialize};

use crate::rubric::Rubric;
use crate::verdict::CriterionScore;

/// Marker the reply is forced to start with (sent as the assistant prefill).
pub const DEFAULT_OPENING_MARKER: &str = "<verdict>";

/// Marker that ends generation (sent as a stop sequence).
pub const DEFAULT_CLOSING_MARKER: &str = "</verdict>";

/// Default token budget for the judge's reply.
pub const DEFAULT_MAX_TOKENS: u32 = 8000;

/// Constraints the provider must apply when generating the reply.
///
/// Together the two markers force the reply to be nothing but the verdict
/// object: the opening marker is prefilled so no preamble can appear, and
/// generation stops at the closing marker so no epilogue can appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConstraints {
    /// Forced prefix of the reply
    pub opening_marker: String,

    /// Stop sequence terminating the reply
    pub closing_marker: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl Default for GenerationConstraints {
    fn default() -> Self {
        Self {
            opening_marker: DEFAULT_OPENING_MARKER.to_string(),
            closing_marker: DEFAULT_CLOSING_MARKER.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl GenerationConstraints {
    /// Reduce reply text to the verdict fragment between the markers.
    ///
    /// Providers strip the prefilled opening marker and the stop sequence,
    /// but some echo one or both; either form yields the same fragment.
    pub fn isolate_fragment<'a>(&self, text: &'a str) -> &'a str {
        let mut fragment = text.trim_start();
        if !self.opening_marker.is_empty() {
            if let Some(rest) = fragment.strip_prefix(self.opening_marker.as_str()) {
                fragment = rest;
            }
        }
        if !self.closing_marker.is_empty() {
            if let Some(end) = fragment.find(self.closing_marker.as_str()) {
                fragment = &fragment[..end];
            }
        }
        fragment.trim()
    }
}

/// Everything sent to the judge for one evaluation. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgmentRequest {
    content: String,
    rubric: Rubric,
    system_prompt: String,
    prompt: String,
    constraints: GenerationConstraints,
}

impl JudgmentRequest {
    /// Assemble a request from already-rendered prompts.
    pub fn new(
        content: impl Into<String>,
        rubric: Rubric,
        system_prompt: impl Into<String>,
        prompt: impl Into<String>,
        constraints: GenerationConstraints,
    ) -> Self {
        Self {
            content: content.into(),
            rubric,
            system_prompt: system_prompt.into(),
            prompt: prompt.into(),
            constraints,
        }
    }

    /// The text being judged.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// User-turn prompt embedding the rubric and the content.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn constraints(&self) -> &GenerationConstraints {
        &self.constraints
    }
}

/// Final outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Aggregate score, unrounded, on the criteria's scale
    pub score: f64,

    /// Judge's rationale; empty if none was given
    pub rationale: String,

    /// Per-criterion scores in rubric order
    pub scores: Vec<CriterionScore>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constraints() {
        let constraints = GenerationConstraints::default();
        assert_eq!(constraints.opening_marker, "<verdict>");
        assert_eq!(constraints.closing_marker, "</verdict>");
        assert_eq!(constraints.max_tokens, 8000);
    }

    #[test]
    fn test_isolate_bare_fragment() {
        let constraints = GenerationConstraints::default();
        assert_eq!(
            constraints.isolate_fragment("\n{\"clarity\": 8}\n"),
            "{\"clarity\": 8}"
        );
    }

    #[test]
    fn test_isolate_echoed_markers() {
        let constraints = GenerationConstraints::default();
        assert_eq!(
            constraints.isolate_fragment("<verdict>{\"a\": 1}</verdict> trailing"),
            "{\"a\": 1}"
        );
    }

    #[test]
    fn test_isolate_keeps_prose_without_markers() {
        let constraints = GenerationConstraints::default();
        assert_eq!(
            constraints.isolate_fragment("Here you go: {\"a\": 1}"),
            "Here you go: {\"a\": 1}"
        );
    }

    #[test]
    fn test_empty_markers_are_ignored() {
        let constraints = GenerationConstraints {
            opening_marker: String::new(),
            closing_marker: String::new(),
            max_tokens: 100,
        };
        assert_eq!(constraints.isolate_fragment(" {} "), "{}");
    }
}
