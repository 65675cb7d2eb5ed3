//! Query orchestration shared by the batch demo and the interactive chat.
//!
//! One query at a time: interpret, invoke, write the artifact, report.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::clients::config_server::ConfigServerClient;
use crate::core::error::GatewayError;
use crate::domain::{ConversationEntry, ParsedRequest, ToolDescriptor, ToolResult};
use crate::infra::config::{Config, InterpreterMode};
use crate::interpreter::{LlmInterpreter, QueryInterpreter, RuleBasedInterpreter};

pub const DEMO_QUERIES: &[&str] = &[
    "Configure CAN for powertrain ECU at 500 kbps with 8 message objects and error handling",
    "Set up NvM blocks for fault logging with 100 fault codes, immediate write and wear-leveling",
    "Configure CAN at 250 kbps with 16 message objects",
    "What is the weather like today?",
];

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub index: usize,
    pub request: ParsedRequest,
    pub result: ToolResult,
    pub artifact_path: Option<PathBuf>,
}

pub struct Session {
    client: ConfigServerClient,
    interpreter: Box<dyn QueryInterpreter>,
    catalog: Vec<ToolDescriptor>,
    transcript: Vec<ConversationEntry>,
    output_dir: PathBuf,
    queries_seen: usize,
}

pub fn build_interpreter(cfg: &Config) -> Result<Box<dyn QueryInterpreter>, GatewayError> {
    let mode = cfg.interpreter.clone().map_err(GatewayError::Precondition)?;
    Ok(match mode {
        InterpreterMode::Rules => Box::new(RuleBasedInterpreter),
        InterpreterMode::Llm => Box::new(LlmInterpreter::from_config(&cfg.llm)?),
    })
}

fn artifact_file_name(index: usize, module: &str) -> String {
    let module: String = module
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("output_query_{index}_{module}.arxml")
}

impl Session {
    pub fn new(
        client: ConfigServerClient,
        interpreter: Box<dyn QueryInterpreter>,
        catalog: Vec<ToolDescriptor>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            interpreter,
            catalog,
            transcript: Vec::new(),
            output_dir: output_dir.into(),
            queries_seen: 0,
        }
    }

    /// Build the interpreter and fetch the catalog. Any failure here is fatal.
    pub async fn start(cfg: &Config) -> Result<Self, GatewayError> {
        let interpreter = build_interpreter(cfg)?;
        let client = ConfigServerClient::from_config(cfg);
        let catalog = client.list_tools().await.map_err(|e| {
            GatewayError::Precondition(format!(
                "cannot fetch tool catalog from {}: {e}",
                client.base_url()
            ))
        })?;
        if catalog.is_empty() {
            return Err(GatewayError::Precondition("tool catalog is empty".into()));
        }
        tracing::info!(
            tools = catalog.len(),
            interpreter = interpreter.name(),
            server = %client.base_url(),
            "session started"
        );
        Ok(Self::new(client, interpreter, catalog, cfg.output_dir.clone()))
    }

    pub fn catalog(&self) -> &[ToolDescriptor] {
        &self.catalog
    }

    pub fn transcript(&self) -> &[ConversationEntry] {
        &self.transcript
    }

    pub async fn process(&mut self, text: &str) -> Result<QueryOutcome, GatewayError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GatewayError::EmptyQuery);
        }
        self.queries_seen += 1;
        let index = self.queries_seen;
        self.transcript.push(ConversationEntry::user(text));

        let outcome = self.run(index, text).await;
        let reply = match &outcome {
            Ok(o) if o.result.success => format!("Generated {} configuration", o.result.module),
            Ok(o) => format!("Error: {}", o.result.error_message.as_deref().unwrap_or("unknown error")),
            Err(e) => format!("Error: {e}"),
        };
        self.transcript.push(ConversationEntry::assistant(reply));
        outcome
    }

    async fn run(&self, index: usize, text: &str) -> Result<QueryOutcome, GatewayError> {
        let request = self
            .interpreter
            .interpret(text, &self.catalog, &self.transcript)
            .await?
            .ok_or(GatewayError::NoMatch)?;
        tracing::info!(index, tool = %request.tool_name, params = ?request.parameters, "query interpreted");

        let result = self.client.invoke(&request.tool_name, &request.parameters).await;
        let artifact_path = if result.success && !result.artifact_text.is_empty() {
            Some(self.write_artifact(index, &result).await?)
        } else {
            None
        };
        Ok(QueryOutcome { index, request, result, artifact_path })
    }

    async fn write_artifact(&self, index: usize, result: &ToolResult) -> Result<PathBuf, GatewayError> {
        let path = self.output_dir.join(artifact_file_name(index, &result.module));
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| GatewayError::Application(format!("cannot create {}: {e}", self.output_dir.display())))?;
        tokio::fs::write(&path, &result.artifact_text)
            .await
            .map_err(|e| GatewayError::Application(format!("cannot write {}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), bytes = result.artifact_text.len(), "artifact written");
        Ok(path)
    }

    /// Process each query in order; per-query errors are reported, not raised.
    pub async fn run_batch<W: Write>(&mut self, queries: &[String], out: &mut W) -> std::io::Result<usize> {
        let mut succeeded = 0;
        for q in queries {
            writeln!(out, "\n> {q}")?;
            let outcome = self.process(q).await;
            if matches!(&outcome, Ok(o) if o.result.success) {
                succeeded += 1;
            }
            writeln!(out, "{}", render_outcome(&outcome))?;
        }
        Ok(succeeded)
    }

    /// Interactive loop: one line per query, `exit` or `quit` to stop.
    pub async fn run_chat<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "AUTOSAR configuration assistant. Type 'exit' to quit.")?;
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if matches!(line.to_ascii_lowercase().as_str(), "exit" | "quit") {
                break;
            }
            let outcome = self.process(line).await;
            writeln!(out, "{}", render_outcome(&outcome))?;
            out.flush()?;
        }
        Ok(())
    }
}

pub fn render_outcome(outcome: &Result<QueryOutcome, GatewayError>) -> String {
    match outcome {
        Ok(o) if o.result.success => {
            let params: Vec<String> = o
                .result
                .parameters
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            let mut s = format!(
                "✅ [{}] {} -> {} ({})",
                o.index,
                o.request.tool_name,
                o.result.module,
                params.join(", ")
            );
            if let Some(path) = &o.artifact_path {
                s.push_str(&format!("\n   saved {}", display_path(path)));
            }
            s
        }
        Ok(o) => format!(
            "❌ [{}] {} failed: {}",
            o.index,
            o.request.tool_name,
            o.result.error_message.as_deref().unwrap_or("unknown error")
        ),
        Err(GatewayError::NoMatch) => "⚠️  could not determine appropriate tool".to_string(),
        Err(e) => format!("❌ {e}"),
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
