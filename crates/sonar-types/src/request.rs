//! Inbound request types for the agent endpoint.
//!
//! The wire format mirrors the dashboard client: camelCase fields, none of
//! which are mutually exclusive. Mode resolution (in `sonar-context`) applies
//! a fixed precedence order to untangle ambiguous combinations.

use serde::{Deserialize, Serialize};

/// A message in the conversation history sent by the chat UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message author.
    pub role: ChatRole,

    /// Plain text content.
    pub content: String,
}

impl ChatMessage {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// The dashboard page the user is currently viewing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Dashboard,
    Calls,
    CallDetail,
    Companies,
    CompanyDetail,
    Team,
}

impl PageType {
    /// Stable string form, used in logs and run records.
    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Dashboard => "dashboard",
            PageType::Calls => "calls",
            PageType::CallDetail => "call_detail",
            PageType::Companies => "companies",
            PageType::CompanyDetail => "company_detail",
            PageType::Team => "team",
        }
    }
}

/// Identifiers scoping a page-specific request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    /// Transcript in view (call detail page).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_id: Option<String>,

    /// Company in view (company detail page).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,

    /// Team in view (team page).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
}

/// Legacy context selector kept for older dashboard clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegacyContextType {
    Call,
    Company,
    Workspace,
}

/// The full agent request body.
///
/// `page_type`/`page_context` is the current client contract; `context_type`/
/// `context_id` is the legacy one. Both may be present on the same request —
/// precedence resolution picks exactly one retrieval mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextRequest {
    /// Conversation so far, newest last.
    pub messages: Vec<ChatMessage>,

    /// Model override; the server default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Legacy context selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_type: Option<LegacyContextType>,

    /// Entity id paired with `context_type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    /// The requesting user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Force workspace-wide semantic retrieval.
    #[serde(default)]
    pub use_semantic_search: bool,

    /// Current dashboard page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_type: Option<PageType>,

    /// Identifiers scoping the current page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_context: Option<PageContext>,
}

impl ContextRequest {
    /// Build a minimal request carrying only a conversation.
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
            context_type: None,
            context_id: None,
            user_id: None,
            use_semantic_search: false,
            page_type: None,
            page_context: None,
        }
    }

    /// The text of the latest user message, if any.
    ///
    /// This is what retrieval treats as the query.
    pub fn latest_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }
}
