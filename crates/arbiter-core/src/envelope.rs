//! The judge model's raw reply.
//!
//! A reply is a sequence of content items, each one of a closed set of kinds.
//! Only [`ContentItem::Text`] carries a payload the evaluator can read; the
//! other kinds exist so that a provider can report exactly what it received
//! instead of flattening it into a string.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag identifying which variant a reply item is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Plain text
    Text,
    /// Internal reasoning emitted before the answer
    Thinking,
    /// Reasoning withheld by the provider
    RedactedThinking,
    /// Client-side tool invocation
    ToolUse,
    /// Provider-executed tool invocation
    ServerToolUse,
    /// Output of a tool invocation
    ToolResult,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Thinking => "thinking",
            ContentKind::RedactedThinking => "redacted_thinking",
            ContentKind::ToolUse => "tool_use",
            ContentKind::ServerToolUse => "server_tool_use",
            ContentKind::ToolResult => "tool_result",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item of a judge reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    RedactedThinking {
        data: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ServerToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: serde_json::Value,
    },
}

impl ContentItem {
    /// Create a plain-text item.
    pub fn text(text: impl Into<String>) -> Self {
        ContentItem::Text { text: text.into() }
    }

    /// The kind tag of this item.
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentItem::Text { .. } => ContentKind::Text,
            ContentItem::Thinking { .. } => ContentKind::Thinking,
            ContentItem::RedactedThinking { .. } => ContentKind::RedactedThinking,
            ContentItem::ToolUse { .. } => ContentKind::ToolUse,
            ContentItem::ServerToolUse { .. } => ContentKind::ServerToolUse,
            ContentItem::ToolResult { .. } => ContentKind::ToolResult,
        }
    }
}

/// Token usage reported alongside a reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// Stop reason reported when the reply was cut off by the token budget.
pub const STOP_REASON_MAX_TOKENS: &str = "max_tokens";

/// Raw reply from the judge model, as returned by a provider.
///
/// Nothing here is trusted: the envelope may be empty or start with a
/// non-text item. [`crate::extract_text`] is the only sanctioned way to read
/// the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReplyEnvelope {
    /// Content items in the order the provider returned them
    pub content: Vec<ContentItem>,

    /// Model that produced the reply, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Why generation stopped, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,

    #[serde(default)]
    pub usage: TokenUsage,
}

impl RawReplyEnvelope {
    pub fn new(content: Vec<ContentItem>) -> Self {
        Self {
            content,
            ..Default::default()
        }
    }

    /// Envelope holding a single plain-text item.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![ContentItem::text(text)])
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_stop_reason(mut self, stop_reason: impl Into<String>) -> Self {
        self.stop_reason = Some(stop_reason.into());
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    /// The first content item, which is the only one the evaluator reads.
    pub fn first(&self) -> Option<&ContentItem> {
        self.content.first()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Whether generation stopped because the token budget ran out.
    pub fn hit_token_limit(&self) -> bool {
        self.stop_reason.as_deref() == Some(STOP_REASON_MAX_TOKENS)
    }
}
