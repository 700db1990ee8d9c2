//! Knowledge base search tool

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use voice_gateway_config::{ToolArgSpec, ToolSchema};
use voice_gateway_core::SessionContext;
use voice_gateway_rag::Retriever;

use crate::{Tool, ToolError, ToolOutcome};

/// Searches the scraped knowledge corpus. Available to both personas.
pub struct SearchKnowledgeBaseTool {
    retriever: Arc<Retriever>,
    top_k: usize,
}

impl SearchKnowledgeBaseTool {
    pub fn new(retriever: Arc<Retriever>, top_k: usize) -> Self {
        Self { retriever, top_k }
    }
}

#[async_trait]
impl Tool for SearchKnowledgeBaseTool {
    fn name(&self) -> &str {
        "search_knowledge_base"
    }

    fn description(&self) -> &str {
        "Search the product knowledge base for information relevant to the user's question"
    }

    fn schema(&self) -> ToolSchema {
        let mut arguments = BTreeMap::new();
        arguments.insert(
            "query".to_string(),
            ToolArgSpec {
                arg_type: "string".to_string(),
                required: true,
                description: Some("What to look up, phrased as a short question".to_string()),
            },
        );
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            arguments,
        }
    }

    async fn execute(
        &self,
        ctx: &SessionContext,
        args: Value,
    ) -> Result<ToolOutcome, ToolError> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::BadArguments("argument 'query' required".to_string()))?;

        tracing::debug!(session = %ctx.session_id, query, "Knowledge base search");
        let answer = self.retriever.query(query, self.top_k).await;
        Ok(ToolOutcome::Text(answer))
    }
}
