//! HTTP API for the Sonar agent.
//!
//! One streaming chat endpoint backed by the context pipeline, a health
//! probe, and the run-review toggle.
//!
//! # Example
//!
//! ```ignore
//! use sonar_server::{AppState, Server, ServerConfig};
//!
//! let state = AppState::new(backend, loader, runs, meter, ServerConfig::new());
//! Server::from_state(state).run().await?;
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ErrorResponse, Result, ServerError};
pub use state::AppState;

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The Sonar HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        use axum::routing::{get, post};

        Router::new()
            .route("/health", get(routes::health_handler))
            .route("/api/agent/chat", post(routes::agent_chat_handler))
            .route("/api/runs/{id}/best", post(routes::set_best_handler))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server on the configured bind address.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let router = self.router();

        info!("Starting server on {}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use sonar_cache::TtlCache;
    use sonar_context::{ContextLoader, Fetchers, StaticSearch};
    use sonar_llm::{MockBackend, RecordingMeter};
    use sonar_store::{RunLogger, SalesStore};

    fn create_test_state() -> AppState {
        let store = Arc::new(SalesStore::open_in_memory().unwrap());
        let fetchers = Fetchers::new(Arc::clone(&store), Arc::new(TtlCache::default()));
        let loader = ContextLoader::new(fetchers, Arc::new(StaticSearch::empty()));
        AppState::new(
            Arc::new(MockBackend::with_text("Test response")),
            loader,
            RunLogger::new(store),
            Arc::new(RecordingMeter::new()),
            ServerConfig::new(),
        )
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let server = Server::from_state(create_test_state());
        let app = server.router();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_set_best_unknown_run_is_404() {
        let server = Server::from_state(create_test_state());
        let app = server.router();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/runs/nope/best")
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"is_best": true}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
