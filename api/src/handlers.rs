//! Request handlers for `POST /agent/run`, `POST /agent/stream`, and
//! `GET /health` (spec §6, §4.11). Grounded in the teacher's
//! `api/src/handlers/mod.rs` — thin `State`/`Json` extractor handlers
//! that delegate to a manager type and map its errors to an HTTP
//! response, never doing agent logic inline.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Json;
use axum::{debug_handler, http::HeaderMap};
use futures::stream::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use agent_core::TraceEntry;
use agent_executor::{run, ChannelSink, CollectSink};

use crate::error::ApiError;
use crate::models::{
    AgentRunRequest, AgentRunResponse, ApiCitation, ApiErrorBody, ApiErrorCode, ApiInsufficiency,
};
use crate::server::AppState;

const ANONYMOUS_USER: &str = "anonymous";
const STREAM_CHANNEL_CAPACITY: usize = 64;

/// Collaborator auth/rate-limiting is out of scope (spec §1); the API
/// boundary trusts an upstream gateway to have set this header and
/// falls back to a single shared anonymous identity when absent, which
/// is adequate for local/dev deployments and the fake-tool-backed test
/// suite.
fn extract_user_id(headers: &HeaderMap) -> String {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or(ANONYMOUS_USER)
        .to_string()
}

fn validate_request(req: &AgentRunRequest) -> Result<(), ApiError> {
    if req.question.trim().is_empty() {
        return Err(ApiError::Validation("question must not be empty".to_string()));
    }
    if req.mode != "agent" {
        return Err(ApiError::Validation(format!(
            "unsupported mode: {} (only \"agent\" is accepted)",
            req.mode
        )));
    }
    Ok(())
}

#[debug_handler]
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "agent-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// `POST /agent/run`: synchronous — runs the bounded agent loop to
/// completion and returns the full result in one response.
#[debug_handler]
pub async fn run_agent(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<AgentRunRequest>,
) -> Result<Json<AgentRunResponse>, ApiError> {
    validate_request(&request)?;
    let user_id = extract_user_id(&headers);
    let request_id = uuid::Uuid::new_v4();

    tracing::debug!(
        %request_id,
        user_id = %user_id,
        question_len = request.question.len(),
        "running agent"
    );

    let mut sink = CollectSink::new();
    let outcome = run(
        &request.question,
        &user_id,
        state.oracle.as_ref(),
        state.tool.as_ref(),
        &state.config,
        &mut sink,
    )
    .await?;

    let trace = if request.return_trace {
        Some(sink.entries)
    } else {
        None
    };

    Ok(Json(AgentRunResponse {
        answer: outcome.answer,
        citations: outcome.citations.into_iter().map(ApiCitation::from).collect(),
        insufficiencies: outcome
            .insufficiencies
            .into_iter()
            .map(ApiInsufficiency::from)
            .collect(),
        trace,
    }))
}

/// A framed SSE message: `event: trace`, `event: complete`, or
/// `event: error` (spec §4.11 Stream consumer mode).
enum StreamFrame {
    Trace(TraceEntry),
    Complete(AgentRunResponse),
    Error(ApiErrorBody),
}

fn frame_to_event(frame: StreamFrame) -> Event {
    match frame {
        StreamFrame::Trace(entry) => Event::default()
            .event("trace")
            .json_data(&entry)
            .unwrap_or_else(|_| Event::default().event("trace").data("{}")),
        StreamFrame::Complete(response) => Event::default()
            .event("complete")
            .json_data(&response)
            .unwrap_or_else(|_| Event::default().event("complete").data("{}")),
        StreamFrame::Error(body) => Event::default()
            .event("error")
            .json_data(&body)
            .unwrap_or_else(|_| Event::default().event("error").data("{}")),
    }
}

/// `POST /agent/stream`: same request body as `/agent/run`, but the
/// trace is forwarded incrementally as Server-Sent Events while the
/// loop is still in flight, with a terminal `complete` or `error`
/// event once it finishes (spec §4.11, §6).
#[debug_handler]
pub async fn stream_agent(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<AgentRunRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    validate_request(&request)?;
    let user_id = extract_user_id(&headers);
    let request_id = uuid::Uuid::new_v4();

    tracing::debug!(%request_id, user_id = %user_id, "streaming agent run");

    let (frame_tx, frame_rx) = mpsc::channel::<StreamFrame>(STREAM_CHANNEL_CAPACITY);
    let (trace_tx, mut trace_rx) = mpsc::channel::<TraceEntry>(STREAM_CHANNEL_CAPACITY);

    // Forwards every trace entry `ChannelSink` produces into the SSE
    // frame channel as it arrives, so the terminal complete/error frame
    // below can share the same channel without the run itself knowing
    // about `StreamFrame`.
    let forward_tx = frame_tx.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(entry) = trace_rx.recv().await {
            if forward_tx.send(StreamFrame::Trace(entry)).await.is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        let mut sink = ChannelSink::new(trace_tx);
        let result = run(
            &request.question,
            &user_id,
            state.oracle.as_ref(),
            state.tool.as_ref(),
            &state.config,
            &mut sink,
        )
        .await;
        drop(sink);
        // Wait for every already-emitted trace entry to land in the SSE
        // channel before the terminal frame, so a consumer never sees
        // `complete`/`error` ahead of the trace it summarizes.
        let _ = forwarder.await;
        let tx = frame_tx;

        match result {
            Ok(outcome) => {
                let response = AgentRunResponse {
                    answer: outcome.answer,
                    citations: outcome.citations.into_iter().map(ApiCitation::from).collect(),
                    insufficiencies: outcome
                        .insufficiencies
                        .into_iter()
                        .map(ApiInsufficiency::from)
                        .collect(),
                    trace: None,
                };
                let _ = tx.send(StreamFrame::Complete(response)).await;
            }
            Err(e) => {
                let api_err: ApiError = e.into();
                let body = match &api_err {
                    ApiError::Validation(msg) => ApiErrorBody {
                        error: msg.clone(),
                        code: ApiErrorCode::ValidationError,
                    },
                    ApiError::Agent(msg) => ApiErrorBody {
                        error: msg.clone(),
                        code: ApiErrorCode::AgentError,
                    },
                    ApiError::Internal(_) => ApiErrorBody {
                        error: "an internal error occurred".to_string(),
                        code: ApiErrorCode::InternalError,
                    },
                };
                let _ = tx.send(StreamFrame::Error(body)).await;
            }
        }
    });

    let stream = ReceiverStream::new(frame_rx).map(|frame| Ok(frame_to_event(frame)));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
