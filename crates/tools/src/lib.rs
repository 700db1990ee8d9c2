//! Tools the upstream model can invoke mid-conversation
//!
//! A registry maps tool names to handlers. The relay intercepts tool-call
//! events, dispatches here, and feeds the resulting text back into the
//! upstream conversation. Handler failures never surface as errors to the
//! relay: they become `error: ...` output strings so the model can apologize
//! and recover on its next turn.

pub mod account;
pub mod handoff;
pub mod knowledge;
pub mod registry;

pub use account::{
    AccountBalanceTool, AccountDetailsTool, BackendClient, CardDetailsTool, FreezeCardTool,
    ProductOwnershipTool, RecentTransactionsTool, UnfreezeCardTool,
};
pub use handoff::HandoffTool;
pub use knowledge::SearchKnowledgeBaseTool;
pub use registry::{create_registry, ToolRegistry};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use voice_gateway_config::ToolSchema;
use voice_gateway_core::{AgentRole, SessionContext};

/// What a tool produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// Plain text inserted into the conversation as the function output.
    Text(String),
    /// A persona handoff. The executor still emits a function output (a short
    /// acknowledgement) and must not block the upstream response; the relay
    /// schedules the browser notification separately.
    Handoff { target: AgentRole },
}

/// Tool failures. Display strings are user-facing: every variant renders
/// with the `error:` prefix the model is prompted to recognize.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("error: unknown tool '{0}'")]
    NotFound(String),

    #[error("error: {0}")]
    BadArguments(String),

    #[error("error: authentication required for this request")]
    Unauthenticated,

    #[error("error: the account service took too long to respond, please try again in a moment")]
    BackendTimeout,

    #[error("error: the account service returned status {status}")]
    BackendHttp { status: u16 },

    #[error("error: {0}")]
    Internal(String),
}

/// A single named capability: describe itself, validate arguments, execute.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Declared argument shape, also exposed to the model via the persona.
    fn schema(&self) -> ToolSchema;

    /// Auth-gated tools are refused before execution in anonymous sessions.
    fn requires_auth(&self) -> bool {
        false
    }

    async fn execute(&self, ctx: &SessionContext, args: Value)
        -> Result<ToolOutcome, ToolError>;
}
