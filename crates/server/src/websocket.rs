//! Browser WebSocket endpoint
//!
//! `GET /ws/chat?jwt=<token>` upgrades to the session channel. The optional
//! bearer token selects the persona; the gateway then opens the matching
//! upstream connection, configures it, and relays until either side closes.

use axum::{
    extract::{
        ws::{Message as AxumMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use voice_gateway_agent::session_context;
use voice_gateway_upstream::{connect, session_update, greeting_request, UpstreamSink, UpstreamStream};

use crate::metrics;
use crate::relay::{pump_down, pump_up, RelayDeps, WireMessage};
use crate::session::SessionInfo;
use crate::state::AppState;

/// Channel depth per direction. Deep enough to absorb scheduling jitter,
/// shallow enough that audio is never meaningfully buffered on the gateway.
const CHANNEL_DEPTH: usize = 64;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Optional bearer token; presence selects the account persona.
    pub jwt: Option<String>,
}

/// Handle the WebSocket upgrade on `/ws/chat`.
pub async fn ws_chat_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Result<Response, StatusCode> {
    if state.sessions.count() >= state.settings.server.max_sessions {
        tracing::warn!(live = state.sessions.count(), "Refusing session: at capacity");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, query.jwt)))
}

async fn handle_socket(socket: WebSocket, state: AppState, jwt: Option<String>) {
    let session_id = uuid::Uuid::new_v4().to_string();
    let ctx = session_context(session_id.clone(), jwt);
    let persona = state.personas.persona(ctx.role).clone();

    tracing::info!(
        session = %session_id,
        role = %ctx.role,
        user = %ctx.user_name,
        "Session opening"
    );

    let (mut browser_sink, browser_stream) = socket.split();

    // One upstream connection per browser session, fatal for this session if
    // it cannot be established.
    let upstream = match connect(&state.settings.upstream).await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::error!(session = %session_id, error = %e, "Upstream connect failed");
            metrics::record_upstream_connect_failure();
            let event = serde_json::json!({
                "type": "error",
                "error": { "message": "could not reach the voice service, please retry" },
            });
            let _ = browser_sink.send(AxumMessage::Text(event.to_string())).await;
            let _ = browser_sink.close().await;
            return;
        }
    };
    let (upstream_sink, upstream_stream) = upstream.split();

    if let Err(e) = state.sessions.insert(SessionInfo::new(
        session_id.clone(),
        ctx.role,
        ctx.user_name.clone(),
    )) {
        tracing::warn!(session = %session_id, error = %e, "Session rejected");
        let _ = browser_sink.close().await;
        return;
    }
    metrics::record_session_opened(ctx.role.persona_key());

    // Channels between socket adapters and the pumps.
    let (browser_in_tx, browser_in_rx) = mpsc::channel::<WireMessage>(CHANNEL_DEPTH);
    let (browser_out_tx, browser_out_rx) = mpsc::channel::<WireMessage>(CHANNEL_DEPTH);
    let (upstream_out_tx, upstream_out_rx) = mpsc::channel::<WireMessage>(CHANNEL_DEPTH);
    let (upstream_in_tx, upstream_in_rx) = mpsc::channel::<WireMessage>(CHANNEL_DEPTH);

    // Configure the fresh upstream session before any relayed traffic: these
    // enter the writer channel first, so FIFO delivers them first.
    let configured = upstream_out_tx
        .send(WireMessage::Text(session_update(&persona).to_string()))
        .await
        .is_ok()
        && upstream_out_tx
            .send(WireMessage::Text(greeting_request(&persona).to_string()))
            .await
            .is_ok();
    if !configured {
        state.sessions.remove(&session_id);
        return;
    }

    let deps = Arc::new(RelayDeps {
        ctx,
        tools: state.tools.clone(),
        sessions: state.sessions.clone(),
        handoff_delay_ms: persona.handoff_delay_ms,
    });

    let mut tasks = vec![
        tokio::spawn(browser_reader(browser_stream, browser_in_tx)),
        tokio::spawn(browser_writer(browser_out_rx, browser_sink)),
        tokio::spawn(upstream_reader(upstream_stream, upstream_in_tx)),
        tokio::spawn(upstream_writer(upstream_out_rx, upstream_sink)),
        tokio::spawn(pump_up(browser_in_rx, upstream_out_tx.clone(), deps.clone())),
        tokio::spawn(pump_down(
            upstream_in_rx,
            browser_out_tx,
            upstream_out_tx,
            deps,
        )),
    ];

    // First task to finish means one peer is gone; cancel everything else.
    let (_, _, rest) = futures::future::select_all(tasks.drain(..)).await;
    for task in rest {
        task.abort();
    }

    state.sessions.remove(&session_id);
    metrics::record_session_closed();
    tracing::info!(session = %session_id, "Session closed");
}

async fn browser_reader(mut stream: SplitStream<WebSocket>, tx: mpsc::Sender<WireMessage>) {
    while let Some(Ok(message)) = stream.next().await {
        let wire = match message {
            AxumMessage::Text(text) => WireMessage::Text(text),
            AxumMessage::Binary(bytes) => WireMessage::Binary(bytes),
            AxumMessage::Close(_) => break,
            // Pings are answered by the protocol layer while we keep reading.
            AxumMessage::Ping(_) | AxumMessage::Pong(_) => continue,
        };
        if tx.send(wire).await.is_err() {
            break;
        }
    }
}

async fn browser_writer(
    mut rx: mpsc::Receiver<WireMessage>,
    mut sink: SplitSink<WebSocket, AxumMessage>,
) {
    while let Some(message) = rx.recv().await {
        let frame = match message {
            WireMessage::Text(text) => AxumMessage::Text(text),
            WireMessage::Binary(bytes) => AxumMessage::Binary(bytes),
        };
        if sink.send(frame).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}

async fn upstream_reader(mut stream: UpstreamStream, tx: mpsc::Sender<WireMessage>) {
    while let Some(Ok(message)) = stream.next().await {
        let wire = match message {
            WsMessage::Text(text) => WireMessage::Text(text),
            WsMessage::Binary(bytes) => WireMessage::Binary(bytes),
            WsMessage::Close(_) => break,
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
        };
        if tx.send(wire).await.is_err() {
            break;
        }
    }
}

async fn upstream_writer(mut rx: mpsc::Receiver<WireMessage>, mut sink: UpstreamSink) {
    while let Some(message) = rx.recv().await {
        let frame = match message {
            WireMessage::Text(text) => WsMessage::Text(text),
            WireMessage::Binary(bytes) => WsMessage::Binary(bytes),
        };
        if sink.send(frame).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}
