use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};

use crate::core::error::GatewayError;
use crate::domain::{ParamValue, Parameters, ToolDescriptor, ToolResult};
use crate::infra::config::Config;
use crate::infra::http::headers::add_standard_headers;
use crate::infra::runtime::limits::make_http_client;

/// Client for the configuration server: catalog fetch and tool execution.
///
/// Each call is a single attempt bounded by the configured timeout.
#[derive(Clone)]
pub struct ConfigServerClient {
    base: String,
    http: Client,
}

impl ConfigServerClient {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base: base.into(),
            http: make_http_client(timeout),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.server_url.clone(), cfg.tool_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    pub async fn health(&self) -> bool {
        let (builder, _rid) = add_standard_headers(self.http.get(self.url("/")), None);
        match builder.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Fetch the ordered tool catalog.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, GatewayError> {
        let url = self.url("tools");
        tracing::debug!(endpoint = %url, "catalog request");
        let (builder, _rid) = add_standard_headers(self.http.get(url), None);
        let resp = builder
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(GatewayError::Application(format!("upstream status {}", resp.status())));
        }
        let body: CatalogWire = resp
            .json()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(body.tools)
    }

    /// Execute `tool_name` remotely. Failures come back as an unsuccessful
    /// [`ToolResult`], never as an error.
    pub async fn invoke(&self, tool_name: &str, parameters: &Parameters) -> ToolResult {
        let url = self.url(tool_name);
        let start = Instant::now();
        let (builder, rid) = add_standard_headers(self.http.post(&url), None);
        tracing::info!(tool = tool_name, endpoint = %url, request_id = %rid, "invoking tool");

        let result = match builder.json(parameters).send().await {
            Err(e) => ToolResult::failed(e.to_string()),
            Ok(resp) => {
                let status = resp.status();
                match resp.json::<ExecWire>().await {
                    Err(e) if status.is_success() => ToolResult::failed(e.to_string()),
                    Err(_) => ToolResult::failed(format!("upstream status {status}")),
                    Ok(wire) => wire.into_result(status.is_success(), parameters),
                }
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as f64;
        if result.success {
            crate::infra::logging::log_metric(tool_name, "remote_latency_ms", elapsed_ms);
        } else {
            crate::infra::logging::log_metric(tool_name, "remote_error_total", 1.0);
            tracing::warn!(
                tool = tool_name,
                error = result.error_message.as_deref().unwrap_or_default(),
                "tool invocation failed"
            );
        }
        result
    }
}

#[derive(Deserialize)]
struct CatalogWire {
    tools: Vec<ToolDescriptor>,
}

#[derive(Deserialize)]
struct ExecWire {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    module: Option<String>,
    #[serde(default)]
    arxml: Option<String>,
    #[serde(default)]
    parameters: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ExecWire {
    fn into_result(self, status_ok: bool, sent: &Parameters) -> ToolResult {
        if !(status_ok && self.success) {
            let msg = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "unknown error".to_string());
            return ToolResult::failed(msg);
        }
        let parameters = match self.parameters {
            Some(echo) => echo
                .iter()
                .filter_map(|(k, v)| ParamValue::from_json(v).map(|pv| (k.clone(), pv)))
                .collect(),
            None => sent.clone(),
        };
        ToolResult::ok(
            self.module.unwrap_or_default(),
            self.arxml.unwrap_or_default(),
            parameters,
        )
    }
}
