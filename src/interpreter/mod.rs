//! Query interpretation: free text -> at most one tool call.
//!
//! The [`QueryInterpreter`] trait is the seam between the session and the
//! matching strategy. `rules` is the deterministic keyword matcher, `llm`
//! delegates tool selection to an OpenAI-compatible chat endpoint.

use async_trait::async_trait;

use crate::core::error::GatewayError;
use crate::domain::{ConversationEntry, ParsedRequest, ToolDescriptor};

pub mod llm;
pub mod rules;

pub use llm::LlmInterpreter;
pub use rules::RuleBasedInterpreter;

#[async_trait]
pub trait QueryInterpreter: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` is the normal "no match" outcome. `text` must be non-blank.
    async fn interpret(
        &self,
        text: &str,
        catalog: &[ToolDescriptor],
        history: &[ConversationEntry],
    ) -> Result<Option<ParsedRequest>, GatewayError>;
}
