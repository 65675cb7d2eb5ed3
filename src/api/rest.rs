use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value as J};

use crate::infra::http::json::{self as http_json, JsonResponse};
use crate::tools::registry::{CallError, ToolRegistry};

pub const SERVICE_NAME: &str = "AUTOSAR Configuration Gateway";

fn timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

pub async fn index() -> Json<J> {
    Json(json!({
        "status": "running",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": timestamp(),
    }))
}

pub async fn list_tools(State(reg): State<ToolRegistry>) -> Json<J> {
    tracing::info!("listing available tools");
    Json(json!({ "tools": reg.list() }))
}

pub async fn call_tool(
    State(reg): State<ToolRegistry>,
    Path(name): Path<String>,
    body: Option<Json<J>>,
) -> JsonResponse {
    let args = body.map(|Json(v)| v).unwrap_or_else(|| json!({}));
    if !args.is_object() {
        return http_json::error(axum::http::StatusCode::BAD_REQUEST, "request body must be a JSON object");
    }
    tracing::info!(tool = %name, params = %args, "tool call");
    match reg.call(&name, &args).await {
        Ok(mut out) => {
            if let Some(obj) = out.as_object_mut() {
                obj.insert("timestamp".into(), J::String(timestamp()));
            }
            http_json::ok(out)
        }
        Err(CallError::UnknownTool(_)) => http_json::not_found(&reg.names()),
        Err(CallError::Tool(e)) => {
            tracing::error!(tool = %name, error = %e, "tool call failed");
            http_json::from_tool_error(e)
        }
    }
}

pub async fn fallback(State(reg): State<ToolRegistry>) -> JsonResponse {
    http_json::not_found(&reg.names())
}
