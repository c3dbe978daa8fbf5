//! Reply-shape validation.
//!
//! The judge is constrained to answer with exactly one plain-text item. Any
//! other first item is a protocol violation and is reported, never papered
//! over: no scanning of later items, no empty-string fallback.

use thiserror::Error;

use crate::envelope::{ContentItem, ContentKind, RawReplyEnvelope};

/// The reply's first item is not plain text, or the reply is empty.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Unexpected judge reply shape: expected {expected} content, found {}", describe(.found))]
pub struct ContentShapeError {
    /// Kind the protocol requires
    pub expected: ContentKind,

    /// Kind actually found; `None` when the reply had no items
    pub found: Option<ContentKind>,
}

fn describe(found: &Option<ContentKind>) -> String {
    match found {
        Some(kind) => kind.to_string(),
        None => "an empty reply".to_string(),
    }
}

/// Return the text payload of the reply's first item.
pub fn extract_text(envelope: &RawReplyEnvelope) -> Result<&str, ContentShapeError> {
    match envelope.first() {
        Some(ContentItem::Text { text }) => Ok(text),
        Some(other) => Err(ContentShapeError {
            expected: ContentKind::Text,
            found: Some(other.kind()),
        }),
        None => Err(ContentShapeError {
            expected: ContentKind::Text,
            found: None,
        }),
    }
}
