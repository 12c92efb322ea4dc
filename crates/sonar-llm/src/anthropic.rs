//! Anthropic API backend implementation.
//!
//! Connects to Anthropic's Messages API and adapts its SSE stream to
//! [`StreamEvent`]s.

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::{Client, Response, header};
use std::pin::Pin;
use std::time::Duration;

use crate::backend::{LlmBackend, ResponseStream, StreamEvent};
use crate::error::{LlmError, Result};
use crate::types::{CompletionRequest, CompletionResponse, StopReason, Usage};

/// Default API base URL.
const DEFAULT_API_BASE: &str = "https://api.anthropic.com";

/// Default API version.
const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Default timeout for requests.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration for the Anthropic backend.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API.
    pub base_url: String,

    /// API version header.
    pub api_version: String,

    /// Request timeout.
    pub timeout: Duration,
}

impl AnthropicConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create config from the `ANTHROPIC_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            LlmError::Config("ANTHROPIC_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Anthropic Backend
// ─────────────────────────────────────────────────────────────────────────────

/// Anthropic API backend.
pub struct AnthropicBackend {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicBackend {
    /// Create a new Anthropic backend with the given configuration.
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Create a backend from environment configuration.
    pub fn from_env() -> Result<Self> {
        Self::new(AnthropicConfig::from_env()?)
    }

    /// Build the messages endpoint URL.
    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }

    /// Add authentication and API headers to a request.
    fn add_headers(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .header(header::CONTENT_TYPE, "application/json")
    }

    /// Handle a successful response.
    async fn handle_response(response: Response) -> Result<CompletionResponse> {
        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        let body = response.text().await?;
        let parsed: ApiResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Serialization(e.to_string()))?;

        Ok(parsed.into())
    }

    /// Handle an error response.
    async fn handle_error_response(response: Response) -> LlmError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if let Ok(error) = serde_json::from_str::<ApiError>(&body) {
            match status.as_u16() {
                401 => LlmError::Auth(format!("Authentication failed: {}", error.error.message)),
                429 => LlmError::RateLimit(error.error.message),
                500..=599 => LlmError::Backend(format!("Server error: {}", error.error.message)),
                _ => LlmError::Backend(error.error.message),
            }
        } else {
            LlmError::Backend(format!("HTTP {}: {}", status, body))
        }
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        // Ensure streaming is off for this method
        let mut request = request;
        request.stream = false;

        let response = self
            .add_headers(self.client.post(self.messages_url()))
            .json(&request)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<ResponseStream> {
        // Ensure streaming is on
        let mut request = request;
        request.stream = true;

        let response = self
            .add_headers(self.client.post(self.messages_url()))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::handle_error_response(response).await);
        }

        Ok(parse_sse_stream(response.bytes_stream()))
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Response Types
// ─────────────────────────────────────────────────────────────────────────────

/// Internal API response structure.
#[derive(Debug, serde::Deserialize)]
struct ApiResponse {
    id: String,
    content: Vec<ApiContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: ApiUsage,
}

impl From<ApiResponse> for CompletionResponse {
    fn from(api: ApiResponse) -> Self {
        let content = api
            .content
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        let stop_reason = api.stop_reason.as_deref().map(parse_stop_reason);

        CompletionResponse {
            id: api.id,
            content,
            model: api.model,
            stop_reason,
            usage: Usage::new(api.usage.input_tokens, api.usage.output_tokens),
        }
    }
}

fn parse_stop_reason(s: &str) -> StopReason {
    match s {
        "max_tokens" => StopReason::MaxTokens,
        "stop_sequence" => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    }
}

#[derive(Debug, serde::Deserialize)]
struct ApiContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, serde::Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, serde::Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// SSE Stream Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Parse SSE events from a byte stream and convert to StreamEvents.
fn parse_sse_stream(
    byte_stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
) -> ResponseStream {
    Box::pin(futures::stream::unfold(
        SseState {
            byte_stream: Box::pin(byte_stream),
            buffer: String::new(),
            current_event: None,
            done: false,
        },
        |mut state| async move {
            if state.done {
                return None;
            }

            loop {
                // First, try to process any complete events in the buffer
                while let Some(line_end) = state.buffer.find('\n') {
                    let line = state.buffer[..line_end].trim().to_string();
                    state.buffer = state.buffer[line_end + 1..].to_string();

                    if line.is_empty() {
                        // Empty line marks end of event, clear current event
                        state.current_event = None;
                        continue;
                    }

                    if let Some((key, value)) = parse_sse_line(&line) {
                        match key {
                            "event" => {
                                state.current_event = Some(value.to_string());
                            }
                            "data" => {
                                if let Some(event_type) = &state.current_event
                                    && let Some(event) = parse_stream_event(event_type, value)
                                {
                                    if matches!(event, StreamEvent::MessageStop) {
                                        state.done = true;
                                    }
                                    return Some((Ok(event), state));
                                }
                            }
                            _ => {}
                        }
                    }
                }

                // Need more data from the byte stream
                match state.byte_stream.next().await {
                    Some(Ok(bytes)) => {
                        let text = String::from_utf8_lossy(&bytes);
                        state.buffer.push_str(&text);
                    }
                    Some(Err(e)) => {
                        let mut final_state = state;
                        final_state.done = true;
                        return Some((Err(LlmError::Network(e.to_string())), final_state));
                    }
                    None => {
                        return None;
                    }
                }
            }
        },
    ))
}

struct SseState {
    byte_stream: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    buffer: String,
    current_event: Option<String>,
    done: bool,
}

fn parse_sse_line(line: &str) -> Option<(&str, &str)> {
    if let Some(value) = line.strip_prefix("event: ") {
        Some(("event", value))
    } else if let Some(value) = line.strip_prefix("data: ") {
        Some(("data", value))
    } else {
        None
    }
}

fn parse_stream_event(event_type: &str, data: &str) -> Option<StreamEvent> {
    match event_type {
        "message_start" => serde_json::from_str::<MessageStartEvent>(data)
            .ok()
            .map(|parsed| StreamEvent::MessageStart {
                id: parsed.message.id,
                model: parsed.message.model,
                input_tokens: parsed
                    .message
                    .usage
                    .map(|u| u.input_tokens)
                    .unwrap_or_default(),
            }),
        "content_block_delta" => serde_json::from_str::<ContentBlockDeltaEvent>(data)
            .ok()
            .and_then(|parsed| match parsed.delta {
                DeltaContent::TextDelta { text } => Some(StreamEvent::TextDelta(text)),
                DeltaContent::Other => None,
            }),
        "message_delta" => serde_json::from_str::<MessageDeltaEvent>(data).ok().map(
            |parsed| StreamEvent::MessageDelta {
                stop_reason: parsed
                    .delta
                    .stop_reason
                    .as_deref()
                    .map(parse_stop_reason)
                    .unwrap_or(StopReason::EndTurn),
                output_tokens: parsed.usage.output_tokens,
            },
        ),
        "message_stop" => Some(StreamEvent::MessageStop),
        "ping" => Some(StreamEvent::Ping),
        "error" => {
            if let Ok(parsed) = serde_json::from_str::<StreamErrorEvent>(data) {
                Some(StreamEvent::Error {
                    message: parsed.error.message,
                })
            } else {
                Some(StreamEvent::Error {
                    message: "Unknown streaming error".to_string(),
                })
            }
        }
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SSE Event Structures
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Deserialize)]
struct MessageStartEvent {
    message: MessageStartMessage,
}

#[derive(Debug, serde::Deserialize)]
struct MessageStartMessage {
    id: String,
    model: String,
    usage: Option<ApiUsageStart>,
}

#[derive(Debug, serde::Deserialize)]
struct ApiUsageStart {
    input_tokens: u32,
}

#[derive(Debug, serde::Deserialize)]
struct ContentBlockDeltaEvent {
    delta: DeltaContent,
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DeltaContent {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, serde::Deserialize)]
struct MessageDeltaEvent {
    delta: MessageDelta,
    usage: MessageDeltaUsage,
}

#[derive(Debug, serde::Deserialize)]
struct MessageDelta {
    stop_reason: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct MessageDeltaUsage {
    output_tokens: u32,
}

#[derive(Debug, serde::Deserialize)]
struct StreamErrorEvent {
    error: StreamErrorDetail,
}

#[derive(Debug, serde::Deserialize)]
struct StreamErrorDetail {
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = AnthropicConfig::new("test-key");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, DEFAULT_API_BASE);
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
    }

    #[test]
    fn test_config_with_base_url() {
        let config = AnthropicConfig::new("key").with_base_url("http://localhost:8080");
        assert_eq!(config.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_messages_url() {
        let config = AnthropicConfig::new("key");
        let backend = AnthropicBackend::new(config).unwrap();
        assert_eq!(
            backend.messages_url(),
            "https://api.anthropic.com/v1/messages"
        );
    }

    #[test]
    fn test_parse_sse_line() {
        assert_eq!(
            parse_sse_line("event: message_start"),
            Some(("event", "message_start"))
        );
        assert_eq!(
            parse_sse_line("data: {\"foo\": 1}"),
            Some(("data", "{\"foo\": 1}"))
        );
        assert_eq!(parse_sse_line("invalid"), None);
    }

    #[test]
    fn test_parse_message_start() {
        let data = r#"{"message": {"id": "msg_1", "model": "claude-sonnet-4-20250514", "usage": {"input_tokens": 42, "output_tokens": 1}}}"#;
        let event = parse_stream_event("message_start", data).unwrap();
        match event {
            StreamEvent::MessageStart {
                id,
                model,
                input_tokens,
            } => {
                assert_eq!(id, "msg_1");
                assert_eq!(model, "claude-sonnet-4-20250514");
                assert_eq!(input_tokens, 42);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_text_delta() {
        let data = r#"{"index": 0, "delta": {"type": "text_delta", "text": "Hello"}}"#;
        let event = parse_stream_event("content_block_delta", data).unwrap();
        assert!(matches!(event, StreamEvent::TextDelta(t) if t == "Hello"));
    }

    #[test]
    fn test_parse_message_delta() {
        let data = r#"{"delta": {"stop_reason": "end_turn"}, "usage": {"output_tokens": 17}}"#;
        let event = parse_stream_event("message_delta", data).unwrap();
        match event {
            StreamEvent::MessageDelta {
                stop_reason,
                output_tokens,
            } => {
                assert_eq!(stop_reason, StopReason::EndTurn);
                assert_eq!(output_tokens, 17);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_event() {
        let data = r#"{"error": {"type": "overloaded_error", "message": "Overloaded"}}"#;
        let event = parse_stream_event("error", data).unwrap();
        assert!(matches!(event, StreamEvent::Error { message } if message == "Overloaded"));
    }

    #[test]
    fn test_api_response_conversion() {
        let api_response = ApiResponse {
            id: "msg_123".to_string(),
            content: vec![ApiContentBlock {
                text: "Hello!".to_string(),
            }],
            model: "claude-sonnet-4-20250514".to_string(),
            stop_reason: Some("end_turn".to_string()),
            usage: ApiUsage {
                input_tokens: 10,
                output_tokens: 5,
            },
        };

        let response: CompletionResponse = api_response.into();
        assert_eq!(response.id, "msg_123");
        assert_eq!(response.content, "Hello!");
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
        assert_eq!(response.usage.input_tokens, 10);
    }
}
