//! Live session bookkeeping
//!
//! Sessions hold no conversation state on the gateway; this table exists so
//! the capacity bound, `/api/sessions` and the metrics stay truthful. All
//! real per-session state lives in the relay tasks and dies with them. The
//! pumps `touch()` a session on every forwarded message, so `last_activity`
//! distinguishes a busy session from one that has been silently dead since
//! open.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use voice_gateway_core::AgentRole;

use crate::ServerError;

/// Metadata for one live session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: String,
    pub role: AgentRole,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionInfo {
    pub fn new(id: impl Into<String>, role: AgentRole, user_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            role,
            user_name: user_name.into(),
            created_at: now,
            last_activity: now,
        }
    }
}

/// Table of live sessions with a capacity bound.
pub struct SessionManager {
    sessions: DashMap<String, SessionInfo>,
    max_sessions: usize,
}

impl SessionManager {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions,
        }
    }

    /// Register a session at channel accept. Refuses beyond capacity.
    pub fn insert(&self, info: SessionInfo) -> Result<(), ServerError> {
        if self.sessions.len() >= self.max_sessions {
            return Err(ServerError::Capacity(self.sessions.len()));
        }
        self.sessions.insert(info.id.clone(), info);
        Ok(())
    }

    /// Remove a session when either side closes.
    pub fn remove(&self, id: &str) -> Option<SessionInfo> {
        self.sessions.remove(id).map(|(_, info)| info)
    }

    /// Record traffic on a session. Unknown ids are a no-op: the session may
    /// already have been removed while its last messages drain.
    pub fn touch(&self, id: &str) {
        if let Some(mut entry) = self.sessions.get_mut(id) {
            entry.last_activity = Utc::now();
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Copy of every live session's metadata, sorted by id.
    pub fn snapshot(&self) -> Vec<SessionInfo> {
        let mut all: Vec<SessionInfo> = self.sessions.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}
