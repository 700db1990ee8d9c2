//! Role selection and handoff events

use serde_json::{json, Value};

use voice_gateway_core::events::types;
use voice_gateway_core::{AgentRole, SessionContext};

use crate::token::introspect_token;

/// Pick the persona for a new session: any non-empty bearer token selects
/// the account manager, everything else gets the general assistant.
pub fn select_role(auth_token: Option<&str>) -> AgentRole {
    match auth_token {
        Some(token) if !token.is_empty() => AgentRole::Account,
        _ => AgentRole::General,
    }
}

/// Assemble the full session context at channel accept.
pub fn session_context(session_id: impl Into<String>, auth_token: Option<String>) -> SessionContext {
    let role = select_role(auth_token.as_deref());
    let user_name = introspect_token(auth_token.as_deref());
    SessionContext::new(session_id, role, auth_token, user_name)
}

/// Build the `agent.handoff` event sent to the browser. The client reacts by
/// reconnecting as a fresh session under the target role, attaching or
/// clearing its bearer token accordingly.
pub fn handoff_event(target: AgentRole) -> Value {
    let message = match target {
        AgentRole::Account => "Transferring you to your account manager.",
        AgentRole::General => "Transferring you back to our general assistant.",
    };
    json!({
        "type": types::AGENT_HANDOFF,
        "target_agent": target.wire_label(),
        "message": message,
    })
}
