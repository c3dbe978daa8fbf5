//! JSON Schema validation for rubric documents.
//!
//! The schema catches shape problems (unknown keys, wrong types, bad names)
//! before the rubric's own consistency checks run. Violations are reported
//! against the criterion they belong to, so `/criteria/1/weight` reads as
//! `criterion 'correctness' (#2) weight`.

use std::sync::LazyLock;

use serde_json::Value;

/// Embedded rubric schema (loaded at compile time).
const RUBRIC_SCHEMA_JSON: &str = include_str!("../../schema/rubric.schema.json");

/// Compiled once on first use.
static RUBRIC_VALIDATOR: LazyLock<Result<jsonschema::Validator, String>> = LazyLock::new(|| {
    let schema: Value = serde_json::from_str(RUBRIC_SCHEMA_JSON)
        .map_err(|e| format!("Invalid rubric schema JSON: {}", e))?;
    jsonschema::options()
        .build(&schema)
        .map_err(|e| format!("Failed to compile rubric schema: {}", e))
});

/// Validate a rubric document against the schema.
///
/// Returns every violation found, each prefixed with where in the rubric it
/// occurred.
pub fn validate_rubric_schema(rubric_json: &Value) -> Result<(), Vec<String>> {
    let validator = RUBRIC_VALIDATOR.as_ref().map_err(|e| vec![e.clone()])?;

    let errors: Vec<String> = validator
        .iter_errors(rubric_json)
        .map(|e| {
            format!(
                "{}: {}",
                describe_location(rubric_json, &e.instance_path.to_string()),
                e
            )
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Turn a JSON pointer into the rubric document into a readable location.
fn describe_location(rubric_json: &Value, pointer: &str) -> String {
    let segments: Vec<&str> = pointer.split('/').skip(1).collect();

    match segments.as_slice() {
        [] => "rubric".to_string(),
        ["criteria"] => "criteria".to_string(),
        ["criteria", index, rest @ ..] => {
            let Ok(position) = index.parse::<usize>() else {
                return pointer.to_string();
            };
            let label = match rubric_json["criteria"][position]["name"].as_str() {
                Some(name) => format!("criterion '{}' (#{})", name, position + 1),
                None => format!("criterion #{}", position + 1),
            };
            if rest.is_empty() {
                label
            } else {
                format!("{} {}", label, rest.join("."))
            }
        }
        [field, ..] => format!("rubric {}", field),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_rubric_passes_schema() {
        let value = serde_json::json!({
            "criteria": [{ "name": "clarity" }]
        });
        assert!(validate_rubric_schema(&value).is_ok());
    }

    #[test]
    fn test_missing_criteria_fails() {
        let value = serde_json::json!({ "name": "No criteria" });
        let errors = validate_rubric_schema(&value).unwrap_err();
        assert!(errors[0].starts_with("rubric: "));
    }

    #[test]
    fn test_empty_criteria_fails() {
        let value = serde_json::json!({ "criteria": [] });
        let errors = validate_rubric_schema(&value).unwrap_err();
        assert!(errors[0].starts_with("criteria: "));
    }

    #[test]
    fn test_bad_name_pattern_fails() {
        let value = serde_json::json!({
            "criteria": [{ "name": "1st-criterion" }]
        });
        let errors = validate_rubric_schema(&value).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.starts_with("criterion '1st-criterion' (#1) name: ")));
    }

    #[test]
    fn test_zero_max_score_fails() {
        let value = serde_json::json!({
            "criteria": [{ "name": "clarity", "max_score": 0 }]
        });
        let errors = validate_rubric_schema(&value).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.starts_with("criterion 'clarity' (#1) max_score: ")));
    }

    #[test]
    fn test_violation_names_the_criterion() {
        let value = serde_json::json!({
            "criteria": [
                { "name": "clarity" },
                { "name": "correctness", "weight": "heavy" }
            ]
        });
        let errors = validate_rubric_schema(&value).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("criterion 'correctness' (#2) weight: "));
    }

    #[test]
    fn test_unnamed_criterion_uses_position() {
        let value = serde_json::json!({
            "criteria": [{ "description": "no name here" }]
        });
        let errors = validate_rubric_schema(&value).unwrap_err();
        assert!(errors.iter().any(|e| e.starts_with("criterion #1: ")));
    }

    #[test]
    fn test_full_rubric_passes() {
        let value = serde_json::json!({
            "name": "Support reply quality",
            "description": "Scores a customer support reply",
            "criteria": [
                { "name": "empathy", "description": "Acknowledges the customer", "max_score": 5, "weight": 1 },
                { "name": "accuracy", "description": "Facts are right", "max_score": 5, "weight": 2.5 }
            ]
        });
        assert!(validate_rubric_schema(&value).is_ok());
    }

    #[test]
    fn test_describe_location() {
        let doc = serde_json::json!({ "criteria": [{ "name": "tone" }] });
        assert_eq!(describe_location(&doc, ""), "rubric");
        assert_eq!(describe_location(&doc, "/name"), "rubric name");
        assert_eq!(describe_location(&doc, "/criteria/0"), "criterion 'tone' (#1)");
        assert_eq!(describe_location(&doc, "/criteria/7/weight"), "criterion #8 weight");
    }
}
