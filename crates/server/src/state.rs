//! Application state shared across handlers

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use voice_gateway_config::{PersonaSet, Settings};
use voice_gateway_rag::Retriever;
use voice_gateway_tools::ToolRegistry;

use crate::session::SessionManager;

/// Immutable after boot; every field is read-only shared state. Sessions are
/// isolated from each other, this is the only thing they share.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub personas: Arc<PersonaSet>,
    pub retriever: Arc<Retriever>,
    pub tools: Arc<ToolRegistry>,
    pub sessions: Arc<SessionManager>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        personas: PersonaSet,
        retriever: Arc<Retriever>,
        tools: ToolRegistry,
    ) -> Self {
        let max_sessions = settings.server.max_sessions;
        Self {
            settings: Arc::new(settings),
            personas: Arc::new(personas),
            retriever,
            tools: Arc::new(tools),
            sessions: Arc::new(SessionManager::new(max_sessions)),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
