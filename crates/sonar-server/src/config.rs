//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Default request wall-clock budget.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default completion model.
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Default completion budget.
const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Configuration for the Sonar server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_address: SocketAddr,

    /// Model used when the request does not name one.
    pub default_model: String,

    /// Max completion tokens per request.
    pub max_tokens: u32,

    /// Whole-request wall-clock budget; the stream is terminated past it and
    /// the run recorded as an error.
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8787".parse().expect("valid default address"),
            default_model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, address: SocketAddr) -> Self {
        self.bind_address = address;
        self
    }

    /// Set the default model.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the max completion tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
