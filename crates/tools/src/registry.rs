//! Tool registry and executor

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use voice_gateway_config::ToolSchema;
use voice_gateway_core::SessionContext;
use voice_gateway_rag::Retriever;

use crate::account::{
    AccountBalanceTool, AccountDetailsTool, BackendClient, CardDetailsTool, FreezeCardTool,
    ProductOwnershipTool, RecentTransactionsTool, UnfreezeCardTool,
};
use crate::handoff::HandoffTool;
use crate::knowledge::SearchKnowledgeBaseTool;
use crate::{Tool, ToolError, ToolOutcome};

/// Upper bound on any single tool execution.
const TOOL_TIMEOUT_SECS: u64 = 30;

/// Registry mapping tool names to handlers.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Dispatch one intercepted tool call.
    ///
    /// Never fails: every error path is folded into a user-visible output
    /// string so the model can recover verbally. Order of checks: existence,
    /// argument parse, authentication, schema validation, execution with a
    /// timeout. Auth-gated tools are refused before any I/O happens.
    pub async fn dispatch(
        &self,
        ctx: &SessionContext,
        name: &str,
        arguments_json: &str,
    ) -> ToolOutcome {
        match self.try_dispatch(ctx, name, arguments_json).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(tool = name, session = %ctx.session_id, error = %e, "Tool call failed");
                ToolOutcome::Text(e.to_string())
            }
        }
    }

    async fn try_dispatch(
        &self,
        ctx: &SessionContext,
        name: &str,
        arguments_json: &str,
    ) -> Result<ToolOutcome, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        let args: Value = if arguments_json.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments_json).map_err(|e| {
                ToolError::BadArguments(format!("arguments are not valid JSON: {}", e))
            })?
        };

        if tool.requires_auth() && !ctx.is_authenticated() {
            return Err(ToolError::Unauthenticated);
        }

        validate_arguments(&tool.schema(), &args)?;

        tracing::debug!(tool = name, session = %ctx.session_id, "Executing tool");
        match tokio::time::timeout(
            Duration::from_secs(TOOL_TIMEOUT_SECS),
            tool.execute(ctx, args),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ToolError::Internal(format!("tool '{}' timed out", name))),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check arguments against the declared schema: required arguments must be
/// present, present arguments must match their declared type.
pub fn validate_arguments(schema: &ToolSchema, args: &Value) -> Result<(), ToolError> {
    let object = args.as_object().ok_or_else(|| {
        ToolError::BadArguments("arguments must be a JSON object".to_string())
    })?;

    for (name, spec) in &schema.arguments {
        match object.get(name) {
            None | Some(Value::Null) => {
                if spec.required {
                    return Err(ToolError::BadArguments(format!(
                        "argument '{}' required",
                        name
                    )));
                }
            }
            Some(value) => {
                let ok = match spec.arg_type.as_str() {
                    "string" => value.is_string(),
                    "integer" => value.is_i64() || value.is_u64(),
                    "number" => value.is_number(),
                    "boolean" => value.is_boolean(),
                    _ => true,
                };
                if !ok {
                    return Err(ToolError::BadArguments(format!(
                        "argument '{}' must be a {}",
                        name, spec.arg_type
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Build the full registry used by every session. Personas control which
/// subset the model sees; the registry itself holds everything.
pub fn create_registry(
    retriever: Arc<Retriever>,
    backend: Arc<BackendClient>,
    default_top_k: usize,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(SearchKnowledgeBaseTool::new(retriever, default_top_k));

    registry.register(AccountBalanceTool::new(backend.clone()));
    registry.register(AccountDetailsTool::new(backend.clone()));
    registry.register(RecentTransactionsTool::new(backend.clone()));
    registry.register(CardDetailsTool::new(backend.clone()));
    registry.register(FreezeCardTool::new(backend.clone()));
    registry.register(UnfreezeCardTool::new(backend.clone()));
    registry.register(ProductOwnershipTool::new(backend));

    registry.register(HandoffTool::to_account());
    registry.register(HandoffTool::to_general());

    tracing::info!(tools = registry.len(), "Created tool registry");
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;
    use voice_gateway_config::ToolArgSpec;
    use voice_gateway_core::AgentRole;

    struct EchoTool {
        auth: bool,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the message back"
        }

        fn schema(&self) -> ToolSchema {
            let mut arguments = BTreeMap::new();
            arguments.insert(
                "message".to_string(),
                ToolArgSpec {
                    arg_type: "string".to_string(),
                    required: true,
                    description: None,
                },
            );
            ToolSchema {
                name: "echo".to_string(),
                description: "Echo the message back".to_string(),
                arguments,
            }
        }

        fn requires_auth(&self) -> bool {
            self.auth
        }

        async fn execute(
            &self,
            _ctx: &SessionContext,
            args: Value,
        ) -> Result<ToolOutcome, ToolError> {
            let msg = args.get("message").and_then(Value::as_str).unwrap_or("");
            Ok(ToolOutcome::Text(format!("echo: {}", msg)))
        }
    }

    fn anon_ctx() -> SessionContext {
        SessionContext::new("s1", AgentRole::General, None, "Guest")
    }

    fn authed_ctx() -> SessionContext {
        SessionContext::new("s2", AgentRole::Account, Some("tok".to_string()), "Priya")
    }

    #[tokio::test]
    async fn test_dispatch_executes_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool { auth: false });

        let outcome = registry
            .dispatch(&anon_ctx(), "echo", r#"{"message":"hi"}"#)
            .await;
        assert_eq!(outcome, ToolOutcome::Text("echo: hi".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_tool_reports_error_text() {
        let registry = ToolRegistry::new();
        let outcome = registry.dispatch(&anon_ctx(), "nope", "{}").await;
        match outcome {
            ToolOutcome::Text(text) => assert!(text.starts_with("error: unknown tool")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool { auth: false });

        let outcome = registry.dispatch(&anon_ctx(), "echo", "{}").await;
        assert_eq!(
            outcome,
            ToolOutcome::Text("error: argument 'message' required".to_string())
        );
    }

    #[tokio::test]
    async fn test_wrong_argument_type() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool { auth: false });

        let outcome = registry
            .dispatch(&anon_ctx(), "echo", r#"{"message":42}"#)
            .await;
        assert_eq!(
            outcome,
            ToolOutcome::Text("error: argument 'message' must be a string".to_string())
        );
    }

    #[tokio::test]
    async fn test_malformed_json_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool { auth: false });

        let outcome = registry.dispatch(&anon_ctx(), "echo", "{not json").await;
        match outcome {
            ToolOutcome::Text(text) => assert!(text.starts_with("error: arguments are not valid JSON")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_auth_gate_blocks_anonymous() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool { auth: true });

        let outcome = registry
            .dispatch(&anon_ctx(), "echo", r#"{"message":"hi"}"#)
            .await;
        match outcome {
            ToolOutcome::Text(text) => {
                assert!(text.starts_with("error: authentication required"))
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_auth_gate_admits_authenticated() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool { auth: true });

        let outcome = registry
            .dispatch(&authed_ctx(), "echo", r#"{"message":"hi"}"#)
            .await;
        assert_eq!(outcome, ToolOutcome::Text("echo: hi".to_string()));
    }

    #[tokio::test]
    async fn test_empty_arguments_accepted_when_none_required() {
        struct NoArgs;

        #[async_trait]
        impl Tool for NoArgs {
            fn name(&self) -> &str {
                "noargs"
            }
            fn description(&self) -> &str {
                "No arguments"
            }
            fn schema(&self) -> ToolSchema {
                ToolSchema {
                    name: "noargs".to_string(),
                    description: "No arguments".to_string(),
                    arguments: BTreeMap::new(),
                }
            }
            async fn execute(
                &self,
                _ctx: &SessionContext,
                _args: Value,
            ) -> Result<ToolOutcome, ToolError> {
                Ok(ToolOutcome::Text("ok".to_string()))
            }
        }

        let mut registry = ToolRegistry::new();
        registry.register(NoArgs);

        let outcome = registry.dispatch(&anon_ctx(), "noargs", "").await;
        assert_eq!(outcome, ToolOutcome::Text("ok".to_string()));
    }

    #[test]
    fn test_validate_optional_argument_type_checked() {
        let mut arguments = BTreeMap::new();
        arguments.insert(
            "limit".to_string(),
            ToolArgSpec {
                arg_type: "integer".to_string(),
                required: false,
                description: None,
            },
        );
        let schema = ToolSchema {
            name: "t".to_string(),
            description: "d".to_string(),
            arguments,
        };

        assert!(validate_arguments(&schema, &json!({})).is_ok());
        assert!(validate_arguments(&schema, &json!({"limit": 5})).is_ok());
        assert!(validate_arguments(&schema, &json!({"limit": "five"})).is_err());
        assert!(validate_arguments(&schema, &json!({"limit": null})).is_ok());
    }
}
