//! LLM backend trait and the deterministic mock implementation.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{LlmError, Result};
use crate::types::{CompletionRequest, CompletionResponse, StopReason, Usage};

// ─────────────────────────────────────────────────────────────────────────────
// Streaming Types
// ─────────────────────────────────────────────────────────────────────────────

/// A streaming response from an LLM backend.
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send + 'static>>;

/// Events emitted during streaming.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Message started; carries the prompt-token count the provider reports
    /// up front.
    MessageStart {
        id: String,
        model: String,
        input_tokens: u32,
    },
    /// A chunk of generated text.
    TextDelta(String),
    /// Message finished with the stop reason and output-token count.
    MessageDelta {
        stop_reason: StopReason,
        output_tokens: u32,
    },
    /// Message complete.
    MessageStop,
    /// Ping to keep the connection alive.
    Ping,
    /// Provider-reported error mid-stream.
    Error { message: String },
}

impl StreamEvent {
    /// Returns true if this is the final event in a message.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::MessageStop | StreamEvent::Error { .. })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for model-provider backends.
///
/// The agent invoker only ever streams; `complete` exists for callers that
/// want the buffered form (and for exercising backends in tests).
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Execute a completion request and return the full response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Execute a completion request and return a stream of events.
    async fn complete_stream(&self, request: CompletionRequest) -> Result<ResponseStream>;

    /// Get the name of this backend.
    fn name(&self) -> &str;
}

/// A backend that can be shared across threads.
pub type SharedBackend = Arc<dyn LlmBackend>;

// ─────────────────────────────────────────────────────────────────────────────
// Mock Backend
// ─────────────────────────────────────────────────────────────────────────────

/// A mock backend for testing purposes.
///
/// Returns pre-configured responses in order, useful for deterministic
/// testing of the invoker and run logging. `with_stream_events` scripts the
/// exact event sequence, including mid-stream errors.
#[derive(Debug, Default)]
pub struct MockBackend {
    responses: std::sync::Mutex<Vec<CompletionResponse>>,
    scripted_events: std::sync::Mutex<Vec<Vec<Result<StreamEvent>>>>,
    request_log: std::sync::Mutex<Vec<CompletionRequest>>,
    stalled: bool,
}

impl MockBackend {
    /// Create a new mock backend with the given responses.
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses),
            ..Default::default()
        }
    }

    /// Create a mock backend with a single text response.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new(vec![CompletionResponse::new(
            "mock_msg_1",
            "mock-model",
            text,
            StopReason::EndTurn,
            Usage::new(10, 20),
        )])
    }

    /// Create a mock backend that plays back a scripted event sequence on
    /// the next `complete_stream` call.
    pub fn with_stream_events(events: Vec<Result<StreamEvent>>) -> Self {
        Self {
            scripted_events: std::sync::Mutex::new(vec![events]),
            ..Default::default()
        }
    }

    /// Create a mock backend whose stream stays open but never yields,
    /// for exercising timeout handling.
    pub fn stalled() -> Self {
        Self {
            stalled: true,
            ..Default::default()
        }
    }

    /// Get all requests that were made to this backend.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.request_log.lock().unwrap().clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.request_log.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.request_log.lock().unwrap().push(request);

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(LlmError::Backend(
                "MockBackend: no more responses available".to_string(),
            ));
        }
        Ok(responses.remove(0))
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<ResponseStream> {
        if self.stalled {
            self.request_log.lock().unwrap().push(request);
            return Ok(Box::pin(futures::stream::pending()));
        }

        // Scripted sequences take precedence over canned responses.
        {
            let mut scripted = self.scripted_events.lock().unwrap();
            if !scripted.is_empty() {
                self.request_log.lock().unwrap().push(request);
                let events = scripted.remove(0);
                return Ok(Box::pin(futures::stream::iter(events)));
            }
        }

        let response = self.complete(request).await?;

        let events = vec![
            Ok(StreamEvent::MessageStart {
                id: response.id.clone(),
                model: response.model.clone(),
                input_tokens: response.usage.input_tokens,
            }),
            Ok(StreamEvent::TextDelta(response.content)),
            Ok(StreamEvent::MessageDelta {
                stop_reason: response.stop_reason.unwrap_or(StopReason::EndTurn),
                output_tokens: response.usage.output_tokens,
            }),
            Ok(StreamEvent::MessageStop),
        ];

        Ok(Box::pin(futures::stream::iter(events)))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
