use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::AppState;
use crate::error::ScrapeError;
use crate::mcp::tooling::tool_catalog;
use crate::orchestrator::{self, ScrapeRequest};

#[derive(Debug, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    pub title: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpToolsResponse {
    pub tools: Vec<McpTool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpCallRequest {
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpCallResponse {
    pub content: Vec<McpContent>,
    pub is_error: bool,
}

/// A tool result is either inline text or a link to a resource stashed in
/// the store, mirroring how `ScrapeResult` itself carries one or the other.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum McpContent {
    Text { text: String },
    ResourceLink {
        uri: String,
        name: String,
        mime_type: String,
        description: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn list_tools_for_state(state: &AppState) -> McpToolsResponse {
    let tools = tool_catalog(state)
        .into_iter()
        .map(|spec| McpTool {
            name: spec.name.to_string(),
            title: spec.title.to_string(),
            description: spec.description.to_string(),
            input_schema: spec.input_schema,
        })
        .collect();
    McpToolsResponse { tools }
}

pub async fn list_tools(State(state): State<Arc<AppState>>) -> Json<McpToolsResponse> {
    Json(list_tools_for_state(state.as_ref()))
}

/// Both tool surfaces (stdio JSON-RPC and this HTTP mirror) funnel into this
/// one `scrape(&AppState, ScrapeRequest)` call.
pub async fn call_tool(
    State(state): State<Arc<AppState>>,
    Json(request): Json<McpCallRequest>,
) -> Result<Json<McpCallResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!(tool = %request.name, "MCP tool call");

    if request.name != "scrape" {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("unknown tool: {}", request.name),
            }),
        ));
    }

    let scrape_request = parse_request(&state, request.arguments).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse { error: e.user_message() }),
        )
    })?;

    match orchestrator::scrape(&state, &scrape_request).await {
        Ok(result) => Ok(Json(to_call_response(result))),
        Err(e) => Err((status_for_error(&e), Json(ErrorResponse { error: e.user_message() }))),
    }
}

/// Direct path used by `handle_scrape` (the axum `/scrape` route): same
/// orchestrator call, mapped to a plain 4xx/5xx `ErrorResponse` instead of
/// the tool-call envelope.
pub async fn handle_scrape(
    State(state): State<Arc<AppState>>,
    Json(request): Json<McpCallRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let scrape_request = parse_request(&state, request.arguments).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse { error: e.user_message() }),
        )
    })?;

    let result = orchestrator::scrape(&state, &scrape_request)
        .await
        .map_err(|e| (status_for_error(&e), Json(ErrorResponse { error: e.user_message() })))?;

    Ok(Json(serde_json::json!({
        "inline_text": result.inline_text,
        "resource_handle": result.resource_handle.map(|h| serde_json::json!({
            "uri": h.uri,
            "name": h.name,
            "mime_type": h.mime_type,
            "description": h.description,
        })),
        "truncated": result.truncated,
    })))
}

fn status_for_error(err: &ScrapeError) -> StatusCode {
    match err {
        ScrapeError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        ScrapeError::AllBackendsFailed { .. } => StatusCode::BAD_GATEWAY,
        ScrapeError::ParseError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ScrapeError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn to_call_response(result: orchestrator::ScrapeResult) -> McpCallResponse {
    let mut content = vec![McpContent::Text {
        text: result.inline_text,
    }];
    if let Some(handle) = result.resource_handle {
        content.push(McpContent::ResourceLink {
            uri: handle.uri,
            name: handle.name,
            mime_type: handle.mime_type,
            description: handle.description,
        });
    }
    McpCallResponse {
        content,
        is_error: false,
    }
}

fn parse_request(state: &AppState, arguments: serde_json::Value) -> Result<ScrapeRequest, ScrapeError> {
    let url = arguments
        .get("url")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ScrapeError::InvalidArgument("missing required field: url".to_string()))?
        .to_string();

    let timeout_ms = arguments
        .get("timeout_ms")
        .and_then(|v| v.as_u64())
        .unwrap_or(state.config.default_timeout_ms);
    let max_chars = arguments
        .get("max_chars")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(state.config.default_max_chars);
    let start_index = arguments
        .get("start_index")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(0);
    let save_result = arguments
        .get("save_result")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    let force_rescrape = arguments
        .get("force_rescrape")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let extract_query = arguments
        .get("extract_query")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .filter(|_| state.extraction.is_some());

    Ok(ScrapeRequest {
        url,
        timeout_ms,
        max_chars,
        start_index,
        save_result,
        force_rescrape,
        extract_query,
    })
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
