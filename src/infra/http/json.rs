use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::core::tool::ToolError;

pub type JsonResponse = (StatusCode, Json<Value>);

pub fn ok(body: Value) -> JsonResponse {
    (StatusCode::OK, Json(body))
}

pub fn error(status: StatusCode, message: impl Into<String>) -> JsonResponse {
    (status, Json(json!({ "error": message.into() })))
}

pub fn not_found(available: &[&str]) -> JsonResponse {
    let endpoints: Vec<String> = std::iter::once("/tools".to_string())
        .chain(available.iter().map(|n| format!("/{n}")))
        .collect();
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found", "available_endpoints": endpoints })),
    )
}

/// Tool failures are caller faults: 400 with the tool's message.
pub fn from_tool_error(err: ToolError) -> JsonResponse {
    match err {
        ToolError::InvalidParams(m) => error(StatusCode::BAD_REQUEST, m),
    }
}
