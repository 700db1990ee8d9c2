//! Voice gateway server
//!
//! Accepts one WebSocket per browser session on `/ws/chat`, opens the
//! matching upstream realtime connection, and relays between them while
//! intercepting tool calls. A small HTTP surface exposes liveness,
//! readiness, live session info and Prometheus metrics.

pub mod http;
pub mod metrics;
pub mod relay;
pub mod session;
pub mod state;
pub mod websocket;

pub use http::create_router;
pub use metrics::init_metrics;
pub use relay::{pump_down, pump_up, RelayDeps, WireMessage};
pub use session::{SessionInfo, SessionManager};
pub use state::AppState;

use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("session error: {0}")]
    Session(String),

    #[error("capacity reached: {0} live sessions")]
    Capacity(usize),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Session(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::Capacity(_) => axum::http::StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
