//! WebSocket client for the upstream realtime endpoint

use futures::stream::{SplitSink, SplitStream};
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use voice_gateway_config::UpstreamSettings;

use crate::UpstreamError;

pub type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type UpstreamSink = SplitSink<UpstreamSocket, Message>;
pub type UpstreamStream = SplitStream<UpstreamSocket>;

/// An open, unconfigured connection to the realtime peer.
#[derive(Debug)]
pub struct UpstreamConnection {
    socket: UpstreamSocket,
}

impl UpstreamConnection {
    /// Split into writer and reader halves for the relay pumps.
    pub fn split(self) -> (UpstreamSink, UpstreamStream) {
        self.socket.split()
    }
}

/// Open one connection to the upstream realtime endpoint.
///
/// The API key travels in the `api-key` request header, never in the URL;
/// only the deployment name is appended as a query parameter. Connect is
/// bounded by the configured timeout (10 s by default) and failure is fatal
/// for the session being opened.
pub async fn connect(settings: &UpstreamSettings) -> Result<UpstreamConnection, UpstreamError> {
    let url = endpoint_url(settings);

    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| UpstreamError::Endpoint(e.to_string()))?;
    let key = HeaderValue::from_str(&settings.api_key)
        .map_err(|e| UpstreamError::Endpoint(format!("api key not header-safe: {}", e)))?;
    request.headers_mut().insert("api-key", key);

    let timeout = std::time::Duration::from_millis(settings.connect_timeout_ms);
    let connect = connect_async(request);

    match tokio::time::timeout(timeout, connect).await {
        Ok(Ok((socket, response))) => {
            tracing::debug!(status = %response.status(), "Upstream connected");
            Ok(UpstreamConnection { socket })
        }
        Ok(Err(e)) => Err(UpstreamError::Connect(e.to_string())),
        Err(_) => Err(UpstreamError::ConnectTimeout(settings.connect_timeout_ms)),
    }
}

fn endpoint_url(settings: &UpstreamSettings) -> String {
    if settings.deployment.is_empty() {
        return settings.endpoint.clone();
    }
    let separator = if settings.endpoint.contains('?') { '&' } else { '?' };
    format!(
        "{}{}deployment={}",
        settings.endpoint, separator, settings.deployment
    )
}
