use std::path::Path;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;

use super::QueryInterpreter;
use crate::core::error::GatewayError;
use crate::domain::{ConversationEntry, ParamValue, ParsedRequest, Parameters, ToolDescriptor};
use crate::infra::config::LlmConfig;
use crate::infra::http::headers::add_standard_headers;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an AUTOSAR configuration assistant. \
When the user asks for an ECU configuration, call exactly one of the provided tools \
with concrete parameter values. If no tool applies, answer briefly without calling a tool.";

/// Tool selection delegated to an OpenAI-compatible chat completion endpoint.
#[derive(Clone)]
pub struct LlmInterpreter {
    client: reqwest::Client,
    base_url: String,
    model: String,
    system_prompt: String,
}

impl LlmInterpreter {
    pub fn new(
        api_key: &str,
        base_url: impl Into<String>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| GatewayError::Precondition(e.to_string()))?,
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| GatewayError::Precondition(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            system_prompt: system_prompt.into(),
        })
    }

    /// Build from settings. A missing key or an unreadable prompt file is fatal.
    pub fn from_config(cfg: &LlmConfig) -> Result<Self, GatewayError> {
        let key = cfg
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::Precondition("OPENAI_API_KEY is not set".into()))?;
        let prompt = match &cfg.system_prompt_file {
            Some(path) => load_prompt(path)?,
            None => DEFAULT_SYSTEM_PROMPT.to_string(),
        };
        Self::new(key, cfg.base_url.clone(), cfg.model.clone(), prompt)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, text: &str, catalog: &[ToolDescriptor], history: &[ConversationEntry]) -> serde_json::Value {
        let mut messages = vec![json!({"role": "system", "content": self.system_prompt})];
        messages.extend(history.iter().map(|e| json!({"role": e.role, "content": e.content})));
        // Callers may or may not have appended the current query already.
        if history.last().map(|e| e.content.as_str()) != Some(text) {
            messages.push(json!({"role": "user", "content": text}));
        }
        let tools: Vec<_> = catalog
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.input_schema
                    }
                })
            })
            .collect();
        json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.0,
            "tools": tools,
            "tool_choice": "auto"
        })
    }
}

fn load_prompt(path: &Path) -> Result<String, GatewayError> {
    std::fs::read_to_string(path).map_err(|e| {
        GatewayError::Precondition(format!("cannot read prompt template {}: {e}", path.display()))
    })
}

#[async_trait]
impl QueryInterpreter for LlmInterpreter {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn interpret(
        &self,
        text: &str,
        catalog: &[ToolDescriptor],
        history: &[ConversationEntry],
    ) -> Result<Option<ParsedRequest>, GatewayError> {
        let body = self.request_body(text, catalog, history);
        let (builder, _rid) = add_standard_headers(self.client.post(self.endpoint()), None);
        let resp = builder
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Transport(format!("LLM error: {status} {text}")));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let calls = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.tool_calls)
            .unwrap_or_default();

        for call in calls {
            if !catalog.iter().any(|t| t.name == call.function.name) {
                tracing::warn!(tool = %call.function.name, "model chose a tool outside the catalog");
                continue;
            }
            return Ok(Some(ParsedRequest {
                tool_name: call.function.name,
                parameters: arguments_to_parameters(&call.function.arguments),
            }));
        }
        Ok(None)
    }
}

/// Tool-call arguments arrive as a JSON string; keep the scalar fields.
fn arguments_to_parameters(raw: &str) -> Parameters {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => map
            .iter()
            .filter_map(|(k, v)| ParamValue::from_json(v).map(|pv| (k.clone(), pv)))
            .collect(),
        _ => {
            tracing::warn!(arguments = raw, "tool call arguments are not a JSON object");
            Parameters::new()
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallWire>>,
}

#[derive(Deserialize)]
struct ToolCallWire {
    function: FunctionWire,
}

#[derive(Deserialize)]
struct FunctionWire {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::path::PathBuf;

    fn catalog() -> Vec<ToolDescriptor> {
        vec![ToolDescriptor {
            name: "generateCanConfig".into(),
            description: "CAN".into(),
            input_schema: json!({"type": "object"}),
        }]
    }

    fn interpreter(base: String) -> LlmInterpreter {
        LlmInterpreter::new("sk-test", base, "test-model", DEFAULT_SYSTEM_PROMPT).unwrap()
    }

    #[tokio::test]
    async fn maps_first_catalog_tool_call() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer sk-test");
            then.status(200).json_body(json!({
                "choices": [{"message": {"content": null, "tool_calls": [
                    {"id": "1", "type": "function", "function": {"name": "deleteEverything", "arguments": "{}"}},
                    {"id": "2", "type": "function", "function": {
                        "name": "generateCanConfig",
                        "arguments": "{\"ecuType\":\"body\",\"baudrate\":250,\"messageObjects\":4,\"extra\":[1]}"
                    }}
                ]}}]
            }));
        });
        let out = interpreter(server.base_url())
            .interpret("configure CAN for body", &catalog(), &[])
            .await
            .unwrap()
            .unwrap();
        m.assert();
        assert_eq!(out.tool_name, "generateCanConfig");
        assert_eq!(out.parameters["baudrate"], ParamValue::Int(250));
        assert_eq!(out.parameters["ecuType"], ParamValue::Text("body".into()));
        assert!(!out.parameters.contains_key("extra"));
    }

    #[tokio::test]
    async fn plain_answer_is_no_match() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(json!({
                "choices": [{"message": {"content": "Hello!"}}]
            }));
        });
        let out = interpreter(server.base_url()).interpret("hello", &catalog(), &[]).await.unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn http_error_is_transport_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(401).body("bad key");
        });
        let err = interpreter(server.base_url()).interpret("hello", &catalog(), &[]).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(ref m) if m.contains("401")));
    }

    #[test]
    fn request_includes_history_once() {
        let llm = interpreter("http://unused".into());
        let history = vec![
            ConversationEntry::user("configure CAN"),
            ConversationEntry::assistant("done"),
            ConversationEntry::user("now NvM"),
        ];
        let body = llm.request_body("now NvM", &catalog(), &history);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[3]["content"], "now NvM");
        assert_eq!(body["tools"][0]["function"]["name"], "generateCanConfig");
    }

    #[test]
    fn missing_key_is_precondition() {
        let cfg = LlmConfig {
            api_key: None,
            base_url: "http://x".into(),
            model: "m".into(),
            system_prompt_file: None,
        };
        assert!(matches!(LlmInterpreter::from_config(&cfg), Err(GatewayError::Precondition(_))));
    }

    #[test]
    fn missing_prompt_file_is_precondition() {
        let cfg = LlmConfig {
            api_key: Some("k".into()),
            base_url: "http://x".into(),
            model: "m".into(),
            system_prompt_file: Some(PathBuf::from("/definitely/not/here.txt")),
        };
        let err = LlmInterpreter::from_config(&cfg).err().unwrap();
        assert!(err.to_string().contains("prompt template"));
    }

    #[test]
    fn prompt_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompt.txt");
        std::fs::write(&path, "custom prompt").unwrap();
        let cfg = LlmConfig {
            api_key: Some("k".into()),
            base_url: "http://x".into(),
            model: "m".into(),
            system_prompt_file: Some(path),
        };
        let llm = LlmInterpreter::from_config(&cfg).unwrap();
        assert_eq!(llm.system_prompt, "custom prompt");
    }
}
