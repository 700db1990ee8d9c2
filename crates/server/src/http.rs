//! HTTP endpoints and router

use axum::{
    extract::State,
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::websocket::ws_chat_handler;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.settings.server.cors_allowed_origins);

    Router::new()
        .route("/ws/chat", get(ws_chat_handler))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics_handler))
        .route("/api/sessions", get(list_sessions))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Build the CORS layer from configured origins; an empty list is permissive
/// for development.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        tracing::warn!("No CORS origins configured, allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        tracing::warn!("All configured CORS origins invalid, allowing all origins");
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET])
        .allow_headers(Any)
}

/// Liveness.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Readiness: upstream must be configured; the retriever reports its mode.
async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let upstream_configured = !state.settings.upstream.endpoint.is_empty();
    let body = serde_json::json!({
        "ready": upstream_configured,
        "vector_store": state.retriever.vector_ready(),
        "sections": state.retriever.section_count(),
    });
    let status = if upstream_configured {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

/// Prometheus metrics.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

/// Live sessions with their activity timestamps.
async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions: Vec<serde_json::Value> = state
        .sessions
        .snapshot()
        .into_iter()
        .map(|s| {
            serde_json::json!({
                "id": s.id,
                "role": s.role.persona_key(),
                "user": s.user_name,
                "created_at": s.created_at.to_rfc3339(),
                "last_activity": s.last_activity.to_rfc3339(),
            })
        })
        .collect();
    Json(serde_json::json!({
        "count": state.sessions.count(),
        "sessions": sessions,
    }))
}
