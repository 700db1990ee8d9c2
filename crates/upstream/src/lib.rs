//! Upstream realtime peer
//!
//! The gateway is a WebSocket *client* of the realtime model. One connection
//! exists per browser session; it is configured with the session's persona
//! immediately after the socket opens and dies with the session.

pub mod client;
pub mod protocol;

pub use client::{connect, UpstreamConnection, UpstreamSink, UpstreamStream};
pub use protocol::{greeting_request, session_update};

use thiserror::Error;

/// Upstream peer errors
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("upstream connect failed: {0}")]
    Connect(String),

    #[error("upstream connect timed out after {0} ms")]
    ConnectTimeout(u64),

    #[error("invalid upstream endpoint: {0}")]
    Endpoint(String),
}
