use axum::{
    routing::{get, post},
    Router,
};

use crate::api::rest;
use crate::tools::registry::ToolRegistry;

/// Configuration server: health, catalog and one POST route per tool name.
pub fn build_app(registry: ToolRegistry) -> Router {
    Router::new()
        .route("/", get(rest::index))
        .route("/healthz", get(rest::index))
        .route("/tools", get(rest::list_tools))
        .route("/:tool", post(rest::call_tool))
        .fallback(rest::fallback)
        .with_state(registry)
}
