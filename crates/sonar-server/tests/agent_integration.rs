//! End-to-end tests for the agent endpoint through the full router.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use sonar_cache::TtlCache;
use sonar_context::{ContextLoader, Fetchers, StaticSearch};
use sonar_llm::{MockBackend, RecordingMeter};
use sonar_server::{AppState, Server, ServerConfig};
use sonar_store::{RunLogger, SalesStore, testing};

fn seeded_store() -> Arc<SalesStore> {
    let store = SalesStore::open_in_memory().unwrap();
    testing::create_dashboard_schema(&store);
    testing::insert_user(&store, "u1", Some("Dana"), Some("team-1"), Some("plg"));
    testing::insert_company(
        &store,
        "7",
        "Acme",
        Some("acme.io"),
        Some("u1"),
        Some(r#"["manual forecasting"]"#),
        None,
        None,
    );
    testing::insert_transcript(
        &store,
        testing::TranscriptFixture {
            id: "42".into(),
            title: "Demo Call".into(),
            company_id: Some("7".into()),
            user_id: Some("u1".into()),
            created_at: "2026-03-10T14:00:00Z".into(),
            score: Some(72),
            ..Default::default()
        },
    );
    testing::link_company_call(&store, "7", "42", "2026-03-10T14:00:00Z");
    Arc::new(store)
}

fn build_app(store: Arc<SalesStore>, backend: MockBackend) -> (Router, RunLogger) {
    let fetchers = Fetchers::new(Arc::clone(&store), Arc::new(TtlCache::default()));
    let loader = ContextLoader::new(fetchers, Arc::new(StaticSearch::returning("- search hit")));
    let runs = RunLogger::new(store);
    let state = AppState::new(
        Arc::new(backend),
        loader,
        runs.clone(),
        Arc::new(RecordingMeter::new()),
        ServerConfig::new(),
    );
    (Server::from_state(state).router(), runs)
}

async fn post_chat(app: &Router, body: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/agent/chat")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&bytes).to_string())
}

async fn wait_for_runs(runs: &RunLogger, expected: i64) {
    for _ in 0..200 {
        if runs.count().unwrap() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} run records", expected);
}

#[tokio::test]
async fn test_company_context_served_from_cache_across_requests() {
    let store = seeded_store();
    let backend = MockBackend::new(vec![
        sonar_llm::CompletionResponse::new(
            "m1",
            "mock-model",
            "First answer",
            sonar_llm::StopReason::EndTurn,
            sonar_llm::Usage::new(10, 20),
        ),
        sonar_llm::CompletionResponse::new(
            "m2",
            "mock-model",
            "Second answer",
            sonar_llm::StopReason::EndTurn,
            sonar_llm::Usage::new(10, 20),
        ),
    ]);
    let (app, runs) = build_app(Arc::clone(&store), backend);

    let body = r#"{"messages": [{"role": "user", "content": "Tell me about Acme"}],
                   "contextType": "company", "contextId": "7", "userId": "u1"}"#;

    let (status, _) = post_chat(&app, body).await;
    assert_eq!(status, StatusCode::OK);
    wait_for_runs(&runs, 1).await;

    let first = runs.latest().unwrap().unwrap();
    assert!(first.system_prompt.contains("## Company: Acme"));

    // Remove the source rows. Inside the TTL window the rendered company
    // overview must come from cache, not a second fetch.
    testing::execute(
        &store,
        "DELETE FROM companies; DELETE FROM company_calls; DELETE FROM transcripts;",
    );

    let (status, _) = post_chat(&app, body).await;
    assert_eq!(status, StatusCode::OK);
    wait_for_runs(&runs, 2).await;

    let second = runs.latest().unwrap().unwrap();
    assert!(second.system_prompt.contains("## Company: Acme"));
    assert_eq!(second.output, "Second answer");
}

#[tokio::test]
async fn test_page_specific_precedence_end_to_end() {
    let store = seeded_store();
    let (app, runs) = build_app(store, MockBackend::with_text("Pipeline looks healthy."));

    // Legacy selector and page selector both present: page wins.
    let body = r#"{"messages": [{"role": "user", "content": "Summarize my dashboard"}],
                   "pageType": "dashboard", "userId": "u1",
                   "contextType": "call", "contextId": "42"}"#;

    let (status, sse) = post_chat(&app, body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(sse.contains(r#""mode":"page_specific""#));

    wait_for_runs(&runs, 1).await;
    let record = runs.latest().unwrap().unwrap();
    assert_eq!(record.context_type, "page");
    assert!(record.system_prompt.contains("# Page context: dashboard"));
    assert!(record.system_prompt.contains("# Workspace search results"));
    assert!(record.system_prompt.contains("- search hit"));
}

#[tokio::test]
async fn test_fallback_workspace_for_bare_user() {
    let store = seeded_store();
    let (app, runs) = build_app(store, MockBackend::with_text("Here is what I know."));

    let body = r#"{"messages": [{"role": "user", "content": "What should I focus on?"}],
                   "userId": "u1"}"#;

    let (status, sse) = post_chat(&app, body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(sse.contains(r#""mode":"fallback_workspace""#));

    wait_for_runs(&runs, 1).await;
    let record = runs.latest().unwrap().unwrap();
    assert_eq!(record.context_type, "workspace");
}

#[tokio::test]
async fn test_set_best_round_trip() {
    let store = seeded_store();
    let (app, runs) = build_app(store, MockBackend::with_text("Answer"));

    let body = r#"{"messages": [{"role": "user", "content": "hi"}], "userId": "u1"}"#;
    let (status, _) = post_chat(&app, body).await;
    assert_eq!(status, StatusCode::OK);
    wait_for_runs(&runs, 1).await;

    let record = runs.latest().unwrap().unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/runs/{}/best", record.id))
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"is_best": true}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(runs.get(&record.id).unwrap().unwrap().is_best);
}
