//! Keyword-driven query interpretation.
//!
//! Matching is plain substring search over the lowercased query. Numbers are
//! not word-bounded: a baud rate candidate such as `125` also matches inside
//! `1250`, and the first `<n> message` / `<n> fault` hit wins even when later
//! ones exist. Known limitation, kept so outputs stay stable.

use async_trait::async_trait;
use regex::Regex;

use super::QueryInterpreter;
use crate::core::error::GatewayError;
use crate::domain::{ConversationEntry, ParsedRequest, Parameters, ToolDescriptor};

pub const CAN_TOOL: &str = "generateCanConfig";
pub const NVM_TOOL: &str = "generateNvmConfig";

const CAN_KEYWORDS: &[&str] = &["can"];
const INTENT_KEYWORDS: &[&str] = &["configur", "set up", "setup", "generate", "create"];
const NVM_KEYWORDS: &[&str] = &["nvm", "fault", "non-volatile", "nonvolatile"];

const ECU_TYPES: &[&str] = &["powertrain", "body", "chassis"];
const BAUD_CANDIDATES: &[i64] = &[125, 250, 500, 1000];

const DEFAULT_ECU: &str = "powertrain";
const DEFAULT_BAUD: i64 = 500;
const DEFAULT_MESSAGE_OBJECTS: i64 = 8;
const DEFAULT_BLOCK_COUNT: i64 = 10;
const DEFAULT_BLOCK_SIZE: i64 = 256;

const MESSAGE_COUNT_PATTERN: &str = r"(\d+)\s*message";
const BLOCK_COUNT_PATTERN: &str = r"(\d+)\s*(?:fault|block)";

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

/// First capture of `pattern` in scan order. Digit runs too long for `i64`
/// saturate so the server's range check rejects them.
fn first_number(pattern: &str, text: &str) -> Option<i64> {
    let rx = Regex::new(pattern).ok()?;
    rx.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().parse::<i64>().unwrap_or(i64::MAX))
}

fn can_parameters(text: &str) -> Parameters {
    let ecu = ECU_TYPES
        .iter()
        .copied()
        .find(|e| text.contains(e))
        .unwrap_or(DEFAULT_ECU);
    let baud = BAUD_CANDIDATES
        .iter()
        .copied()
        .find(|b| text.contains(&b.to_string()))
        .unwrap_or(DEFAULT_BAUD);
    let messages = first_number(MESSAGE_COUNT_PATTERN, text).unwrap_or(DEFAULT_MESSAGE_OBJECTS);

    let mut p = Parameters::new();
    p.insert("ecuType".into(), ecu.into());
    p.insert("baudrate".into(), baud.into());
    p.insert("messageObjects".into(), messages.into());
    p.insert("errorHandling".into(), text.contains("error").into());
    p.insert("wakeupSupport".into(), text.contains("wakeup").into());
    p
}

fn nvm_parameters(text: &str) -> Parameters {
    let blocks = first_number(BLOCK_COUNT_PATTERN, text).unwrap_or(DEFAULT_BLOCK_COUNT);
    let strategy = if text.contains("immediate") {
        "immediate"
    } else if text.contains("deferred") {
        "deferred"
    } else {
        "immediate"
    };

    let mut p = Parameters::new();
    p.insert("blockCount".into(), blocks.into());
    p.insert("blockSize".into(), DEFAULT_BLOCK_SIZE.into());
    p.insert("writeStrategy".into(), strategy.into());
    p.insert("crcProtection".into(), true.into());
    p.insert("redundancy".into(), text.contains("redundan").into());
    p.insert("wearLeveling".into(), text.contains("wear").into());
    p
}

/// Map free text onto a tool call. CAN is checked before NvM, so a query
/// mentioning both resolves to CAN.
pub fn interpret(text: &str, catalog: &[ToolDescriptor]) -> Option<ParsedRequest> {
    let lower = text.to_lowercase();

    let (tool_name, parameters) =
        if contains_any(&lower, CAN_KEYWORDS) && contains_any(&lower, INTENT_KEYWORDS) {
            (CAN_TOOL, can_parameters(&lower))
        } else if contains_any(&lower, NVM_KEYWORDS) {
            (NVM_TOOL, nvm_parameters(&lower))
        } else {
            return None;
        };

    if !catalog.iter().any(|t| t.name == tool_name) {
        tracing::debug!(tool = tool_name, "matched tool is not in the catalog");
        return None;
    }

    Some(ParsedRequest { tool_name: tool_name.to_string(), parameters })
}

/// Deterministic stand-in for model-driven tool selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedInterpreter;

#[async_trait]
impl QueryInterpreter for RuleBasedInterpreter {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn interpret(
        &self,
        text: &str,
        catalog: &[ToolDescriptor],
        _history: &[ConversationEntry],
    ) -> Result<Option<ParsedRequest>, GatewayError> {
        Ok(interpret(text, catalog))
    }
}
