//! Anthropic Messages API provider.
//!
//! Generation constraints map directly onto the API: the opening marker is
//! sent as a prefilled assistant turn, the closing marker as the only stop
//! sequence. Response content blocks are carried over in order into the
//! envelope, so a reply that opens with a `thinking` or `tool_use` block
//! reaches the validator as exactly that. Only the first block has to be
//! representable; later blocks of a type the envelope has no kind for are
//! dropped.

use super::{
    factory::ProviderFactory,
    secrets::{ApiCredential, CredentialSource},
    CompletionConfig, JudgeProvider, ProviderError, DEFAULT_MODEL,
};
use arbiter_core::{ContentItem, JudgmentRequest, RawReplyEnvelope, TokenUsage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Environment variable name for Anthropic API key.
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude judge provider.
pub struct AnthropicProvider {
    credential: ApiCredential,
    base_url: String,
    settings: CompletionConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("settings", &self.settings)
            .finish()
    }
}

impl AnthropicProvider {
    /// Create a provider with default model settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_credential(
            ApiCredential::new(api_key, CredentialSource::Programmatic, "Anthropic API key"),
            CompletionConfig::default(),
        )
    }

    fn with_credential(credential: ApiCredential, settings: CompletionConfig) -> Self {
        Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            settings,
            client: reqwest::Client::new(),
        }
    }

    /// Create from JSON configuration with environment fallback for the key.
    ///
    /// Recognised keys: `api_key`, `base_url`, `model`, `temperature`,
    /// `timeout`.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let credential = ApiCredential::resolve(
            config,
            "api_key",
            ANTHROPIC_API_KEY_ENV,
            "Anthropic API key",
        )?;
        let settings = CompletionConfig::from_json(config)?;

        let mut provider = Self::with_credential(credential, settings);
        if let Some(url) = config["base_url"].as_str() {
            provider.base_url = url.trim_end_matches('/').to_string();
        }
        Ok(provider)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_settings(mut self, settings: CompletionConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &CompletionConfig {
        &self.settings
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop_sequences: Vec<&'a str>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

fn build_body<'a>(request: &'a JudgmentRequest, settings: &'a CompletionConfig) -> MessagesRequest<'a> {
    let constraints = request.constraints();

    let mut messages = vec![Message {
        role: "user",
        content: request.prompt(),
    }];
    if !constraints.opening_marker.is_empty() {
        messages.push(Message {
            role: "assistant",
            content: &constraints.opening_marker,
        });
    }

    let stop_sequences = if constraints.closing_marker.is_empty() {
        Vec::new()
    } else {
        vec![constraints.closing_marker.as_str()]
    };

    MessagesRequest {
        model: &settings.model,
        max_tokens: constraints.max_tokens,
        system: Some(request.system_prompt()).filter(|s| !s.is_empty()),
        messages,
        stop_sequences,
        temperature: settings.temperature,
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<JsonValue>,
    model: Option<String>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

/// Map one response block onto the closed set of envelope item kinds.
fn convert_block(block: JsonValue) -> Result<ContentItem, ProviderError> {
    let block_type = block["type"]
        .as_str()
        .ok_or_else(|| ProviderError::ParseError("content block has no type".to_string()))?
        .to_string();

    match block_type.as_str() {
        "text" | "thinking" | "redacted_thinking" | "tool_use" | "server_tool_use" => {
            serde_json::from_value(block).map_err(|e| {
                ProviderError::ParseError(format!("malformed {} block: {}", block_type, e))
            })
        }
        // mcp_tool_use and other connector-executed invocations
        t if t.ends_with("_tool_use") => {
            let field = |key: &str| {
                block[key].as_str().map(str::to_string).ok_or_else(|| {
                    ProviderError::ParseError(format!("{} block has no {}", t, key))
                })
            };
            Ok(ContentItem::ServerToolUse {
                id: field("id")?,
                name: field("name")?,
                input: block["input"].clone(),
            })
        }
        // web_search_tool_result, code_execution_tool_result, ...
        t if t == "tool_result" || t.ends_with("_tool_result") => {
            let tool_use_id = block["tool_use_id"]
                .as_str()
                .ok_or_else(|| {
                    ProviderError::ParseError(format!("{} block has no tool_use_id", t))
                })?
                .to_string();
            Ok(ContentItem::ToolResult {
                tool_use_id,
                content: block["content"].clone(),
            })
        }
        other => Err(ProviderError::ParseError(format!(
            "unknown content block type '{}'",
            other
        ))),
    }
}

fn into_envelope(body: MessagesResponse) -> Result<RawReplyEnvelope, ProviderError> {
    let mut blocks = body.content.into_iter();
    let mut content = Vec::with_capacity(blocks.len());

    // The first block decides acceptance, so it must convert
    if let Some(first) = blocks.next() {
        content.push(convert_block(first)?);
    }
    for (index, block) in blocks.enumerate() {
        match convert_block(block) {
            Ok(item) => content.push(item),
            Err(e) => tracing::debug!(index = index + 1, error = %e, "Dropping content block"),
        }
    }

    Ok(RawReplyEnvelope {
        content,
        model: body.model,
        stop_reason: body.stop_reason,
        usage: TokenUsage {
            prompt_tokens: body.usage.input_tokens,
            completion_tokens: body.usage.output_tokens,
        },
    })
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl JudgeProvider for AnthropicProvider {
    async fn invoke(&self, request: &JudgmentRequest) -> Result<RawReplyEnvelope, ProviderError> {
        let body = build_body(request, &self.settings);
        let timeout = self.settings.timeout;

        tracing::debug!(
            model = %self.settings.model,
            max_tokens = body.max_tokens,
            prompt_tokens_estimate = self.estimate_tokens(request.prompt()),
            "Sending judgment request"
        );
        let started = Instant::now();

        // The key is only exposed here, at the point of use
        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.credential.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after: retry_after(response.headers()),
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ProviderError::AuthError);
        }

        if !status.is_success() {
            let raw = response
                .text()
                .await
                .map_err(|e| ProviderError::HttpError(e.to_string()))?;
            let message = serde_json::from_str::<AnthropicError>(&raw)
                .map(|e| e.error.message)
                .unwrap_or(raw);
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: MessagesResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(timeout)
            } else {
                ProviderError::ParseError(e.to_string())
            }
        })?;
        let envelope = into_envelope(body)?;

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            items = envelope.content.len(),
            stop_reason = envelope.stop_reason.as_deref().unwrap_or("unknown"),
            completion_tokens = envelope.usage.completion_tokens,
            "Received judge reply"
        );

        Ok(envelope)
    }

    async fn health_check(&self) -> bool {
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

/// Factory for Anthropic providers.
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "sk-ant-...",
///   "base_url": "https://api.anthropic.com/v1",
///   "model": "claude-haiku-4-5-20251001",
///   "temperature": 0.0,
///   "timeout": "30s"
/// }
/// ```
/// Every key is optional; `api_key` falls back to `ANTHROPIC_API_KEY`.
pub struct AnthropicProviderFactory;

impl ProviderFactory for AnthropicProviderFactory {
    fn provider_type(&self) -> &'static str {
        "anthropic"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn JudgeProvider>, ProviderError> {
        Ok(Arc::new(AnthropicProvider::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if !ApiCredential::is_available(config, "api_key", ANTHROPIC_API_KEY_ENV) {
            return Err(ProviderError::NotConfigured(format!(
                "Anthropic API key required: set 'api_key' in config or {} env",
                ANTHROPIC_API_KEY_ENV
            )));
        }

        if let Some(url) = config["base_url"].as_str() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ProviderError::NotConfigured(
                    "base_url must start with http:// or https://".to_string(),
                ));
            }
        }

        CompletionConfig::from_json(config).map(|_| ())
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({
            "model": DEFAULT_MODEL,
            "temperature": 0.0,
            "timeout": "30s"
        })
    }

    fn description(&self) -> &'static str {
        "Anthropic Claude judge via the Messages API"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_core::{ContentKind, Criterion, GenerationConstraints, Rubric};

    fn request(constraints: GenerationConstraints) -> JudgmentRequest {
        let rubric = Rubric::new(vec![Criterion::new("clarity", "Easy to follow")]).unwrap();
        JudgmentRequest::new("content", rubric, "system text", "user text", constraints)
    }

    fn response(content: JsonValue) -> MessagesResponse {
        serde_json::from_value(serde_json::json!({
            "content": content,
            "model": "claude-haiku-4-5-20251001",
            "stop_reason": "stop_sequence",
            "usage": {"input_tokens": 120, "output_tokens": 30}
        }))
        .unwrap()
    }

    #[test]
    fn test_body_prefills_and_stops_on_markers() {
        let request = request(GenerationConstraints::default());
        let settings = CompletionConfig::default();
        let body = serde_json::to_value(build_body(&request, &settings)).unwrap();

        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], 8000);
        assert_eq!(body["system"], "system text");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "user text");
        assert_eq!(body["messages"][1]["role"], "assistant");
        assert_eq!(body["messages"][1]["content"], "<verdict>");
        assert_eq!(body["stop_sequences"], serde_json::json!(["</verdict>"]));
    }

    #[test]
    fn test_body_without_markers() {
        let request = request(GenerationConstraints {
            opening_marker: String::new(),
            closing_marker: String::new(),
            max_tokens: 512,
        });
        let settings = CompletionConfig::default();
        let body = serde_json::to_value(build_body(&request, &settings)).unwrap();

        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert!(body.get("stop_sequences").is_none());
        assert_eq!(body["max_tokens"], 512);
    }

    #[test]
    fn test_envelope_keeps_block_order_and_kinds() {
        let envelope = into_envelope(response(serde_json::json!([
            {"type": "thinking", "thinking": "hmm", "signature": "sig"},
            {"type": "text", "text": "{\"clarity\": 7}"}
        ])))
        .unwrap();

        assert_eq!(envelope.content.len(), 2);
        assert_eq!(envelope.content[0].kind(), ContentKind::Thinking);
        assert_eq!(envelope.content[1].kind(), ContentKind::Text);
        assert_eq!(envelope.stop_reason.as_deref(), Some("stop_sequence"));
        assert_eq!(envelope.usage.total(), 150);
    }

    #[test]
    fn test_envelope_maps_tool_blocks() {
        let envelope = into_envelope(response(serde_json::json!([
            {"type": "server_tool_use", "id": "srv_1", "name": "web_search", "input": {"query": "x"}},
            {"type": "web_search_tool_result", "tool_use_id": "srv_1", "content": []},
            {"type": "tool_use", "id": "tu_1", "name": "lookup", "input": {}}
        ])))
        .unwrap();

        let kinds: Vec<_> = envelope.content.iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                ContentKind::ServerToolUse,
                ContentKind::ToolResult,
                ContentKind::ToolUse
            ]
        );
    }

    #[test]
    fn test_text_citations_are_ignored() {
        let envelope = into_envelope(response(serde_json::json!([
            {"type": "text", "text": "{}", "citations": null}
        ])))
        .unwrap();
        assert_eq!(envelope.content[0], ContentItem::text("{}"));
    }

    #[test]
    fn test_later_unknown_block_is_dropped() {
        let envelope = into_envelope(response(serde_json::json!([
            {"type": "text", "text": "{\"clarity\": 7}"},
            {"type": "container_upload", "file_id": "file_1"},
            {"type": "text"}
        ])))
        .unwrap();

        assert_eq!(envelope.content, vec![ContentItem::text("{\"clarity\": 7}")]);
    }

    #[test]
    fn test_mcp_tool_use_first_is_a_tool_invocation() {
        let envelope = into_envelope(response(serde_json::json!([
            {"type": "mcp_tool_use", "id": "mcptoolu_1", "name": "search", "server_name": "docs", "input": {"q": "x"}},
            {"type": "mcp_tool_result", "tool_use_id": "mcptoolu_1", "is_error": false, "content": []},
            {"type": "text", "text": "{\"clarity\": 7}"}
        ])))
        .unwrap();

        assert_eq!(
            envelope.content[0],
            ContentItem::ServerToolUse {
                id: "mcptoolu_1".into(),
                name: "search".into(),
                input: serde_json::json!({"q": "x"}),
            }
        );
        assert_eq!(envelope.content[1].kind(), ContentKind::ToolResult);

        match arbiter_core::extract_text(&envelope) {
            Err(e) => assert_eq!(e.found, Some(ContentKind::ServerToolUse)),
            other => panic!("Expected ContentShapeError, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_block_type_is_parse_error() {
        let result = into_envelope(response(serde_json::json!([
            {"type": "hologram", "data": "?"}
        ])));
        match result {
            Err(ProviderError::ParseError(message)) => assert!(message.contains("hologram")),
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_known_block_is_parse_error() {
        let result = into_envelope(response(serde_json::json!([{"type": "text"}])));
        assert!(matches!(result, Err(ProviderError::ParseError(_))));
    }

    #[test]
    fn test_from_config_reads_settings() {
        let provider = AnthropicProvider::from_config(&serde_json::json!({
            "api_key": "config-key",
            "base_url": "https://proxy.example.com/v1/",
            "model": "claude-sonnet-4-5",
            "timeout": "2m"
        }))
        .unwrap();

        assert_eq!(provider.base_url, "https://proxy.example.com/v1");
        assert_eq!(provider.settings().model, "claude-sonnet-4-5");
        assert_eq!(provider.settings().timeout, Duration::from_secs(120));
        assert_eq!(provider.credential.source(), CredentialSource::Config);
    }

    #[test]
    fn test_with_base_url_trims_trailing_slash() {
        let provider = AnthropicProvider::new("key").with_base_url("http://127.0.0.1:8080/v1/");
        assert_eq!(provider.base_url, "http://127.0.0.1:8080/v1");
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let secret_key = "sk-ant-REDACTED";
        let provider = AnthropicProvider::new(secret_key);
        let debug_output = format!("{:?}", provider);
        assert!(!debug_output.contains(secret_key));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_health_check_requires_key() {
        assert!(AnthropicProvider::new("key").health_check().await);
        assert!(!AnthropicProvider::new("").health_check().await);
    }

    #[test]
    fn test_factory_validation() {
        let factory = AnthropicProviderFactory;
        assert_eq!(factory.provider_type(), "anthropic");
        assert!(factory
            .validate_config(&serde_json::json!({"api_key": "k"}))
            .is_ok());
        assert!(factory
            .validate_config(&serde_json::json!({"api_key": "k", "base_url": "ftp://x"}))
            .is_err());
        assert!(factory
            .validate_config(&serde_json::json!({"api_key": "k", "timeout": "whenever"}))
            .is_err());
    }

    #[test]
    fn test_factory_default_config() {
        let config = AnthropicProviderFactory.default_config();
        assert_eq!(config["model"], DEFAULT_MODEL);
        assert_eq!(config["timeout"], "30s");
    }
}
