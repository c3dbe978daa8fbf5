//! Rubric definition and validation.
//!
//! A rubric is the ordered list of criteria the judge scores. Rubric
//! documents are YAML or JSON validated against `schema/rubric.schema.json`,
//! then checked for internal consistency before a [`Rubric`] is handed out.

mod parser;
mod schema;

pub use parser::{Criterion, Rubric, RubricConfigError, RubricError, DEFAULT_MAX_SCORE};
pub use schema::validate_rubric_schema;
