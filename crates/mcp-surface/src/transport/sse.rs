//! The hand-rolled `axum` SSE route for `MCP_TRANSPORT=sse` (spec §6,
//! §4.8). `rmcp`'s own transport only covers stdio here; a single
//! streaming POST endpoint is enough to let an HTTP-based MCP client
//! call tools and stream a one-shot response back without pulling in a
//! second protocol stack.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::server_handler::RegistryServerHandler;

#[derive(Clone)]
struct SseState {
    handler: Arc<RegistryServerHandler>,
}

#[derive(Debug, Deserialize)]
struct CallToolRequest {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

fn bearer_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

async fn list_tools(State(state): State<SseState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "tools": state.handler.tool_catalog() }))
}

/// A single SSE event carrying the tool's envelope (or error envelope),
/// then the stream closes. Streaming incremental progress for long-running
/// tasks is out of scope here — poll `get_task_status` instead (spec §4.3).
async fn call_tool(
    State(state): State<SseState>,
    headers: HeaderMap,
    Json(request): Json<CallToolRequest>,
) -> impl IntoResponse {
    let bearer = bearer_from_headers(&headers);
    let (body, is_error) = state.handler.dispatch(&request.name, request.arguments, bearer.as_deref()).await;
    let event = Event::default().event(if is_error { "error" } else { "result" }).json_data(body).unwrap_or_else(|_| Event::default().data("{}"));
    Sse::new(stream::once(async move { Ok::<_, std::convert::Infallible>(event) })).keep_alive(KeepAlive::default())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub fn router(handler: RegistryServerHandler) -> Router {
    let state = SseState {
        handler: Arc::new(handler),
    };
    Router::new()
        .route("/mcp/tools", get(list_tools))
        .route("/mcp/tools/call", post(call_tool))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
