//! Persona handoff tools
//!
//! Invoked by the model when the conversation belongs to the other persona:
//! an anonymous caller asking for account operations, or an authenticated
//! caller asking for general help after signing out. The tool itself only
//! returns the signal; the relay emits the browser notification after the
//! persona's configured delay so the current utterance can finish.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

use voice_gateway_config::{ToolArgSpec, ToolSchema};
use voice_gateway_core::{AgentRole, SessionContext};

use crate::{Tool, ToolError, ToolOutcome};

pub struct HandoffTool {
    target: AgentRole,
    name: &'static str,
    description: &'static str,
}

impl HandoffTool {
    /// Handoff for the general persona toward the account persona.
    pub fn to_account() -> Self {
        Self {
            target: AgentRole::Account,
            name: "handoff_to_account_agent",
            description: "Transfer the caller to the account manager for authenticated account operations",
        }
    }

    /// Handoff for the account persona back to the general persona.
    pub fn to_general() -> Self {
        Self {
            target: AgentRole::General,
            name: "handoff_to_general_agent",
            description: "Transfer the caller to the general assistant for product questions",
        }
    }
}

#[async_trait]
impl Tool for HandoffTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn schema(&self) -> ToolSchema {
        let mut arguments = BTreeMap::new();
        arguments.insert(
            "reason".to_string(),
            ToolArgSpec {
                arg_type: "string".to_string(),
                required: true,
                description: Some("Why the caller needs the other agent".to_string()),
            },
        );
        arguments.insert(
            "context".to_string(),
            ToolArgSpec {
                arg_type: "string".to_string(),
                required: false,
                description: Some("Anything the next agent should know".to_string()),
            },
        );
        ToolSchema {
            name: self.name.to_string(),
            description: self.description.to_string(),
            arguments,
        }
    }

    async fn execute(
        &self,
        ctx: &SessionContext,
        args: Value,
    ) -> Result<ToolOutcome, ToolError> {
        let reason = args
            .get("reason")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::BadArguments("argument 'reason' required".to_string()))?;

        tracing::info!(
            session = %ctx.session_id,
            from = %ctx.role,
            to = %self.target,
            reason,
            "Handoff requested"
        );

        Ok(ToolOutcome::Handoff {
            target: self.target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> SessionContext {
        SessionContext::new("s1", AgentRole::General, None, "Guest")
    }

    #[tokio::test]
    async fn test_handoff_returns_signal() {
        let tool = HandoffTool::to_account();
        let outcome = tool
            .execute(&ctx(), json!({"reason": "wants balance"}))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ToolOutcome::Handoff {
                target: AgentRole::Account
            }
        );
    }

    #[tokio::test]
    async fn test_handoff_requires_reason() {
        let tool = HandoffTool::to_general();
        let err = tool.execute(&ctx(), json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "error: argument 'reason' required");
    }

    #[test]
    fn test_names_and_targets() {
        assert_eq!(HandoffTool::to_account().name(), "handoff_to_account_agent");
        assert_eq!(HandoffTool::to_general().name(), "handoff_to_general_agent");
    }
}
