use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::core::AppState;
use crate::mcp::http::{list_tools_for_state, McpCallRequest};

/// Newline-delimited JSON-RPC loop over stdio, mirroring
/// `initialize`/`tools/list`/`tools/call` — the same shape the engine's own
/// integration tests drive.
#[derive(Clone)]
pub struct McpService {
    pub state: Arc<AppState>,
}

impl McpService {
    pub async fn new() -> anyhow::Result<Self> {
        let state = AppState::init().await?;
        Ok(Self {
            state: Arc::new(state),
        })
    }
}

fn jsonrpc_error(id: &Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message.into() }
    })
}

fn jsonrpc_result(id: &Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

async fn handle_tools_list(service: &McpService, id: &Value) -> Value {
    let tools = list_tools_for_state(service.state.as_ref());
    match serde_json::to_value(tools) {
        Ok(v) => jsonrpc_result(id, v),
        Err(e) => jsonrpc_error(id, -32603, format!("failed to serialize tools: {e}")),
    }
}

async fn handle_tools_call(service: &McpService, id: &Value, params: &Value) -> Value {
    let name = params.get("name").and_then(|v| v.as_str());
    let arguments = params.get("arguments");

    let Some(name) = name else {
        return jsonrpc_error(id, -32602, "Missing required field: params.name");
    };
    let Some(arguments) = arguments else {
        return jsonrpc_error(id, -32602, "Missing required field: params.arguments");
    };

    let request = McpCallRequest {
        name: name.to_string(),
        arguments: arguments.clone(),
    };

    let result = crate::mcp::call_tool(State(Arc::clone(&service.state)), Json(request)).await;
    match result {
        Ok(Json(response)) => match serde_json::to_value(response) {
            Ok(v) => jsonrpc_result(id, v),
            Err(e) => jsonrpc_error(id, -32603, format!("failed to serialize result: {e}")),
        },
        Err((status, Json(err))) => {
            let code = match status {
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => -32602,
                StatusCode::NOT_FOUND => -32601,
                _ => -32603,
            };
            jsonrpc_error(id, code, err.error)
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let service = McpService::new().await?;
    info!("scrape-engine stdio server initialized; waiting for client session");

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    let mut has_initialize = false;
    let mut is_initialized = false;
    let mut shutdown_requested = false;

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let Ok(msg) = serde_json::from_str::<Value>(trimmed) else {
            continue;
        };

        let method = msg.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let id = msg.get("id").cloned().unwrap_or(Value::Null);
        let is_request = msg.get("id").is_some();
        let params = msg.get("params").cloned().unwrap_or(Value::Null);

        if !is_request {
            match method {
                "initialized" => {
                    has_initialize = true;
                    is_initialized = true;
                    continue;
                }
                "exit" => {
                    if shutdown_requested {
                        break;
                    }
                    continue;
                }
                _ => continue,
            }
        }

        let response = match method {
            "initialize" => {
                has_initialize = true;
                let server_info = json!({
                    "name": "scrape-engine",
                    "title": "Scrape Engine",
                    "version": env!("CARGO_PKG_VERSION")
                });
                jsonrpc_result(
                    &id,
                    json!({
                        "protocolVersion": "2024-11-05",
                        "capabilities": {"tools": {}},
                        "serverInfo": server_info
                    }),
                )
            }
            "shutdown" => {
                shutdown_requested = true;
                jsonrpc_result(&id, Value::Null)
            }
            "tools/list" => {
                if !has_initialize || !is_initialized {
                    jsonrpc_error(&id, -32002, "Server not initialized")
                } else {
                    handle_tools_list(&service, &id).await
                }
            }
            "tools/call" => {
                if !has_initialize || !is_initialized {
                    jsonrpc_error(&id, -32002, "Server not initialized")
                } else {
                    handle_tools_call(&service, &id, &params).await
                }
            }
            _ => jsonrpc_error(&id, -32601, format!("Method not found: {method}")),
        };

        let out = serde_json::to_string(&response).unwrap_or_else(|e| {
            serde_json::to_string(&jsonrpc_error(&id, -32603, format!("serialize error: {e}")))
                .unwrap_or_else(|_| "{\"jsonrpc\":\"2.0\",\"id\":null,\"error\":{\"code\":-32603,\"message\":\"serialize error\"}}".to_string())
        });

        stdout.write_all(out.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    warn!("scrape-engine stdio server stopped");
    Ok(())
}
