//! Model-provider abstraction for Sonar.
//!
//! Defines the [`LlmBackend`] trait the agent invoker streams through, an
//! Anthropic Messages API implementation, a deterministic mock for tests,
//! per-model pricing for cost accounting, and the best-effort usage meter.

pub mod anthropic;
pub mod backend;
pub mod error;
pub mod meter;
pub mod pricing;
pub mod types;

pub use anthropic::{AnthropicBackend, AnthropicConfig};
pub use backend::{LlmBackend, MockBackend, ResponseStream, SharedBackend, StreamEvent};
pub use error::{LlmError, Result};
pub use meter::{RecordingMeter, TracingMeter, UsageMeter};
pub use pricing::ModelPricing;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, Usage};
