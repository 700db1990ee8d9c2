//! Session identity and agent roles

use serde::{Deserialize, Serialize};

/// Which persona a session is running under.
///
/// `General` answers product questions for anonymous callers; `Account` can
/// reach the backend account API and only exists for sessions that supplied a
/// bearer token at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    General,
    Account,
}

impl AgentRole {
    /// Single-letter label used on the wire in `agent.handoff` events.
    pub fn wire_label(&self) -> &'static str {
        match self {
            AgentRole::General => "A",
            AgentRole::Account => "B",
        }
    }

    /// Key of this role's persona in the persona config document.
    pub fn persona_key(&self) -> &'static str {
        match self {
            AgentRole::General => "general",
            AgentRole::Account => "account",
        }
    }

    /// The role a handoff from this role targets.
    pub fn other(&self) -> AgentRole {
        match self {
            AgentRole::General => AgentRole::Account,
            AgentRole::Account => AgentRole::General,
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.persona_key())
    }
}

/// Per-session context passed down every call chain.
///
/// Created when the browser channel is accepted and dropped when either side
/// closes; nothing here outlives the session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Opaque session identifier.
    pub session_id: String,
    /// Persona the session runs under.
    pub role: AgentRole,
    /// Bearer token supplied at connect time, if any. Forwarded verbatim to
    /// the backend account API; never interpreted beyond mock introspection.
    pub auth_token: Option<String>,
    /// Display name derived from the token payload, or "Guest".
    pub user_name: String,
}

impl SessionContext {
    pub fn new(
        session_id: impl Into<String>,
        role: AgentRole,
        auth_token: Option<String>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            role,
            auth_token,
            user_name: user_name.into(),
        }
    }

    /// Whether auth-gated tools may run in this session.
    pub fn is_authenticated(&self) -> bool {
        self.auth_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}
