use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use todo_agent::bridge::{CallToolRequest, CallToolResponse, ListToolsResponse};
use todo_agent::models::content::Content;
use todo_agent::models::message::ToolRequest;
use todo_agent::models::tool::ToolCall;

use crate::state::AppState;

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

async fn list_tools(State(state): State<AppState>) -> Json<ListToolsResponse> {
    Json(ListToolsResponse {
        tools: state.invoker.tools().to_vec(),
    })
}

/// Failures of the tool itself are part of a normal 200 response
async fn call_tool(
    State(state): State<AppState>,
    Json(request): Json<CallToolRequest>,
) -> Json<CallToolResponse> {
    let id = request.id.unwrap_or_else(|| {
        format!("call_{}", NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed))
    });
    tracing::info!(tool = %request.name, id = %id, "tool call received");

    let tool_request = ToolRequest {
        id,
        tool_call: Ok(ToolCall::new(request.name, request.arguments)),
    };
    let response = state.invoker.invoke(&tool_request).await;

    let is_error = response.is_error();
    let content = match response.tool_result {
        Ok(content) => content,
        Err(e) => vec![Content::text(e.to_string())],
    };

    Json(CallToolResponse {
        id: response.id,
        is_error,
        content,
    })
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/tools", get(list_tools))
        .route("/tools/call", post(call_tool))
        .with_state(state)
}
