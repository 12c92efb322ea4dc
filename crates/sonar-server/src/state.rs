//! Application state shared across handlers.

use std::sync::Arc;

use sonar_context::ContextLoader;
use sonar_llm::{SharedBackend, UsageMeter};
use sonar_store::RunLogger;

use crate::config::ServerConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Model provider backend.
    pub backend: SharedBackend,

    /// Context assembly pipeline.
    pub loader: Arc<ContextLoader>,

    /// Run record writer.
    pub runs: RunLogger,

    /// Best-effort usage meter.
    pub meter: Arc<dyn UsageMeter>,

    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        backend: SharedBackend,
        loader: ContextLoader,
        runs: RunLogger,
        meter: Arc<dyn UsageMeter>,
        config: ServerConfig,
    ) -> Self {
        Self {
            backend,
            loader: Arc::new(loader),
            runs,
            meter,
            config: Arc::new(config),
        }
    }
}
