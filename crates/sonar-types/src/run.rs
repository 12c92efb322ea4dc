//! Persisted record of a single agent invocation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal status of an agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Error,
}

impl RunStatus {
    /// Stable string form used in the `agent_runs` table.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Error => "error",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(RunStatus::Completed),
            "error" => Some(RunStatus::Error),
            _ => None,
        }
    }
}

/// One row of the append-mostly `agent_runs` table.
///
/// Created exactly once per request, after the model call finishes or fails.
/// The pipeline never updates or deletes a record; only the reviewer-facing
/// `is_best` flag is mutable after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRunRecord {
    /// Unique run id.
    pub id: String,

    /// Which agent produced this run (currently always "chat").
    pub agent_type: String,

    /// Full serialized prompt sent to the provider.
    pub prompt: String,

    /// System prompt portion.
    pub system_prompt: String,

    /// The user message that triggered the run.
    pub user_message: String,

    /// Model output; partial or empty when the run errored.
    pub output: String,

    /// Model identifier.
    pub model: String,

    /// Prompt tokens reported by the provider.
    pub prompt_tokens: u32,

    /// Completion tokens reported by the provider.
    pub completion_tokens: u32,

    /// Prompt + completion tokens.
    pub total_tokens: u32,

    /// Estimated cost in USD from the per-model pricing table.
    pub cost_usd: f64,

    /// Transcript this run was grounded in, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_id: Option<String>,

    /// Company this run was grounded in, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,

    /// Requesting user, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Resolved context kind ("call", "company", "workspace", "page", "none").
    pub context_type: String,

    /// Wall-clock duration of the model call in milliseconds.
    pub duration_ms: u64,

    pub status: RunStatus,

    /// Provider or pipeline error when `status` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Reviewer-curated "best answer" flag.
    pub is_best: bool,

    /// Creation timestamp, RFC 3339.
    pub created_at: String,
}

impl AgentRunRecord {
    /// Start a record with a fresh id and timestamp; callers fill in the
    /// outcome fields once the model call settles.
    pub fn new(agent_type: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agent_type: agent_type.into(),
            prompt: String::new(),
            system_prompt: String::new(),
            user_message: String::new(),
            output: String::new(),
            model: model.into(),
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            cost_usd: 0.0,
            transcript_id: None,
            company_id: None,
            user_id: None,
            context_type: "none".to_string(),
            duration_ms: 0,
            status: RunStatus::Completed,
            error_message: None,
            is_best: false,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    /// Mark the run as failed with the given message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = RunStatus::Error;
        self.error_message = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults() {
        let record = AgentRunRecord::new("chat", "claude-sonnet-4-20250514");
        assert_eq!(record.agent_type, "chat");
        assert_eq!(record.status, RunStatus::Completed);
        assert!(!record.is_best);
        assert!(record.error_message.is_none());
        assert!(!record.id.is_empty());
    }

    #[test]
    fn test_fail_sets_status_and_message() {
        let mut record = AgentRunRecord::new("chat", "m");
        record.fail("stream aborted");
        assert_eq!(record.status, RunStatus::Error);
        assert_eq!(record.error_message.as_deref(), Some("stream aborted"));
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!(RunStatus::parse("completed"), Some(RunStatus::Completed));
        assert_eq!(RunStatus::parse("error"), Some(RunStatus::Error));
        assert_eq!(RunStatus::parse("bogus"), None);
        assert_eq!(RunStatus::Error.as_str(), "error");
    }
}
