//! The agent endpoint: mode resolution, context loading, model streaming,
//! and run logging.
//!
//! The reply streams to the caller as SSE before the full answer exists.
//! After the stream settles — completed, errored, timed out, or abandoned by
//! the client — exactly one run record is persisted from a spawned task that
//! the response never waits on.

use std::convert::Infallible;

use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use sonar_context::{ContextMode, format_system_prompt};
use sonar_llm::{CompletionRequest, Message, ModelPricing, Role, StreamEvent, Usage};
use sonar_types::{AgentRunRecord, ChatRole, ContextRequest};

use crate::error::{Result, ServerError};
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// SSE Event Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SseSourcesEvent {
    mode: String,
    context_type: String,
}

#[derive(Debug, Serialize)]
struct SseTextEvent {
    content: String,
}

#[derive(Debug, Serialize)]
struct SseDoneEvent {
    prompt_tokens: u32,
    completion_tokens: u32,
    duration_ms: u64,
}

#[derive(Debug, Serialize)]
struct SseErrorEvent {
    message: String,
}

/// Events the invoker task forwards to the SSE stream.
enum AgentEvent {
    Text(String),
    Done { usage: Usage, duration_ms: u64 },
    Error(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Handler
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/agent/chat - streaming agent endpoint.
pub async fn agent_chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ContextRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    if request.messages.is_empty() {
        return Err(ServerError::BadRequest(
            "messages must not be empty".to_string(),
        ));
    }

    // Mode resolution is the only fatal step before the model call.
    let mode = ContextMode::resolve(&request)?;
    debug!(mode = mode.name(), "retrieval mode resolved");

    let bundle = state.loader.load(&mode, &request).await;
    let system_prompt = format_system_prompt(&mode, &bundle);

    let model = request
        .model
        .clone()
        .unwrap_or_else(|| state.config.default_model.clone());
    let messages: Vec<Message> = request
        .messages
        .iter()
        .map(|m| Message {
            role: match m.role {
                ChatRole::User => Role::User,
                ChatRole::Assistant => Role::Assistant,
            },
            content: m.content.clone(),
        })
        .collect();
    let completion = CompletionRequest::new(&model, messages, state.config.max_tokens)
        .with_system(system_prompt.clone())
        .with_streaming();

    let mut record = AgentRunRecord::new("chat", &model);
    record.prompt = serde_json::to_string(&completion.messages).unwrap_or_default();
    record.system_prompt = system_prompt;
    record.user_message = request
        .latest_user_message()
        .unwrap_or_default()
        .to_string();
    record.context_type = mode.context_type().to_string();
    record.transcript_id = mode.transcript_id().map(String::from);
    record.company_id = mode.company_id().map(String::from);
    record.user_id = request.user_id.clone();

    let (tx, mut rx) = mpsc::channel::<AgentEvent>(64);
    let sources = SseSourcesEvent {
        mode: mode.name().to_string(),
        context_type: mode.context_type().to_string(),
    };

    tokio::spawn(run_model_turn(state, completion, record, tx));

    let sse_stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("sources")
            .json_data(sources)
            .unwrap_or_else(|_| Event::default()));

        while let Some(event) = rx.recv().await {
            let event = match event {
                AgentEvent::Text(content) => Event::default()
                    .event("text")
                    .json_data(SseTextEvent { content })
                    .unwrap_or_else(|_| Event::default()),
                AgentEvent::Done { usage, duration_ms } => Event::default()
                    .event("done")
                    .json_data(SseDoneEvent {
                        prompt_tokens: usage.input_tokens,
                        completion_tokens: usage.output_tokens,
                        duration_ms,
                    })
                    .unwrap_or_else(|_| Event::default()),
                AgentEvent::Error(message) => Event::default()
                    .event("error")
                    .json_data(SseErrorEvent { message })
                    .unwrap_or_else(|_| Event::default()),
            };
            yield Ok(event);
        }
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Invoker task
// ─────────────────────────────────────────────────────────────────────────────

/// Consume the model stream, forward deltas, then persist exactly one run
/// record.
///
/// If the SSE side hangs up (send fails), token consumption stops but the
/// record is still written with whatever partial output and usage exist.
async fn run_model_turn(
    state: AppState,
    completion: CompletionRequest,
    mut record: AgentRunRecord,
    tx: mpsc::Sender<AgentEvent>,
) {
    let started = std::time::Instant::now();
    let deadline = Instant::now() + state.config.request_timeout;

    let mut output = String::new();
    let mut usage = Usage::default();
    let mut failure: Option<String> = None;
    let mut client_gone = false;

    match state.backend.complete_stream(completion).await {
        Err(e) => {
            failure = Some(e.to_string());
        }
        Ok(mut stream) => {
            use futures::StreamExt;

            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {
                        failure = Some(format!(
                            "request exceeded the {}s budget",
                            state.config.request_timeout.as_secs()
                        ));
                        break;
                    }
                    next = stream.next() => match next {
                        None => break,
                        Some(Ok(StreamEvent::MessageStart { input_tokens, .. })) => {
                            usage.input_tokens = input_tokens;
                        }
                        Some(Ok(StreamEvent::TextDelta(text))) => {
                            output.push_str(&text);
                            if tx.send(AgentEvent::Text(text)).await.is_err() {
                                debug!("client disconnected, stopping token consumption");
                                client_gone = true;
                                break;
                            }
                        }
                        Some(Ok(StreamEvent::MessageDelta { output_tokens, .. })) => {
                            usage.output_tokens = output_tokens;
                        }
                        Some(Ok(StreamEvent::MessageStop)) => break,
                        Some(Ok(StreamEvent::Ping)) => {}
                        Some(Ok(StreamEvent::Error { message })) => {
                            failure = Some(message);
                            break;
                        }
                        Some(Err(e)) => {
                            failure = Some(e.to_string());
                            break;
                        }
                    }
                }
            }
        }
    }

    let duration_ms = started.elapsed().as_millis() as u64;
    record.output = output;
    record.prompt_tokens = usage.input_tokens;
    record.completion_tokens = usage.output_tokens;
    record.total_tokens = usage.total();
    record.cost_usd = ModelPricing::for_model(&record.model)
        .estimate_cost(usage.input_tokens, usage.output_tokens);
    record.duration_ms = duration_ms;

    match &failure {
        Some(message) => {
            record.fail(message.clone());
            if !client_gone {
                let _ = tx.send(AgentEvent::Error(message.clone())).await;
            }
        }
        None => {
            if !client_gone {
                let _ = tx.send(AgentEvent::Done { usage, duration_ms }).await;
            }
        }
    }
    drop(tx);

    // The user-visible stream is settled; persistence and metering are
    // best-effort from here and never block or surface to the caller.
    let runs = state.runs.clone();
    let meter = state.meter.clone();
    let model = record.model.clone();
    let user_id = record.user_id.clone();
    tokio::spawn(async move {
        if let Err(e) = runs.record(&record) {
            warn!(run_id = %record.id, error = %e, "failed to persist agent run");
        }
        meter
            .track(
                user_id.as_deref(),
                usage.input_tokens,
                usage.output_tokens,
                &model,
            )
            .await;
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
