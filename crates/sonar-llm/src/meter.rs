//! Best-effort usage metering.
//!
//! The meter shares the run logger's contract: fire after the response is on
//! its way, swallow failures, never block or fail the request.

use async_trait::async_trait;
use std::sync::Mutex;
use tracing::debug;

/// Billing/usage sink for completed model calls.
#[async_trait]
pub trait UsageMeter: Send + Sync {
    /// Record one exchange. Implementations must not fail the caller;
    /// delivery problems are their own to log and drop.
    async fn track(
        &self,
        user_id: Option<&str>,
        prompt_tokens: u32,
        completion_tokens: u32,
        model: &str,
    );
}

/// Meter that only emits a structured log line.
///
/// Stands in for the hosted billing collector in self-contained deployments.
#[derive(Debug, Default)]
pub struct TracingMeter;

#[async_trait]
impl UsageMeter for TracingMeter {
    async fn track(
        &self,
        user_id: Option<&str>,
        prompt_tokens: u32,
        completion_tokens: u32,
        model: &str,
    ) {
        debug!(
            user_id = user_id.unwrap_or("-"),
            prompt_tokens,
            completion_tokens,
            model,
            "usage tracked"
        );
    }
}

/// A recorded usage event, for assertions in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEvent {
    pub user_id: Option<String>,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub model: String,
}

/// Meter that records events in memory.
#[derive(Debug, Default)]
pub struct RecordingMeter {
    events: Mutex<Vec<UsageEvent>>,
}

impl RecordingMeter {
    /// Create an empty recording meter.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events tracked so far.
    pub fn events(&self) -> Vec<UsageEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl UsageMeter for RecordingMeter {
    async fn track(
        &self,
        user_id: Option<&str>,
        prompt_tokens: u32,
        completion_tokens: u32,
        model: &str,
    ) {
        self.events.lock().unwrap().push(UsageEvent {
            user_id: user_id.map(|s| s.to_string()),
            prompt_tokens,
            completion_tokens,
            model: model.to_string(),
        });
    }
}
