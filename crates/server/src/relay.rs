//! Relay core: two single-direction pumps per session
//!
//! The pumps operate on channels of [`WireMessage`] rather than sockets;
//! small adapter tasks in `websocket.rs` translate axum and tungstenite
//! frames at the edges. Channel order is FIFO, which is the ordering
//! guarantee per direction.
//!
//! Up-pump: browser to upstream, verbatim, no parsing.
//!
//! Down-pump: upstream to browser. Textual events are parsed; tool-call
//! completions are intercepted and dispatched, everything else is forwarded
//! as received. Binary frames pass through untouched.

use dashmap::DashSet;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use voice_gateway_core::events::{self, types};
use voice_gateway_core::{SessionContext, ToolCallEvent};
use voice_gateway_tools::{ToolOutcome, ToolRegistry};

use crate::metrics;
use crate::session::SessionManager;

/// One frame on either leg of the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    Text(String),
    Binary(Vec<u8>),
}

/// Everything the pumps need beyond their channels.
pub struct RelayDeps {
    pub ctx: SessionContext,
    pub tools: Arc<ToolRegistry>,
    /// Session table, touched on every forwarded message so the bookkeeping
    /// tracks real traffic.
    pub sessions: Arc<SessionManager>,
    /// Delay between a handoff tool call and the browser notification, from
    /// the active persona.
    pub handoff_delay_ms: u64,
}

impl RelayDeps {
    fn touch(&self) {
        self.sessions.touch(&self.ctx.session_id);
    }
}

/// Browser to upstream: forward every message verbatim. Ends when the
/// browser side closes or the upstream writer goes away; either way the
/// session driver tears the rest down.
pub async fn pump_up(
    mut browser_rx: mpsc::Receiver<WireMessage>,
    upstream_tx: mpsc::Sender<WireMessage>,
    deps: Arc<RelayDeps>,
) {
    while let Some(message) = browser_rx.recv().await {
        deps.touch();
        if upstream_tx.send(message).await.is_err() {
            break;
        }
    }
}

/// Upstream to browser: parse, intercept tool calls, forward the rest.
pub async fn pump_down(
    mut upstream_rx: mpsc::Receiver<WireMessage>,
    browser_tx: mpsc::Sender<WireMessage>,
    upstream_tx: mpsc::Sender<WireMessage>,
    deps: Arc<RelayDeps>,
) {
    // One in-flight tool call per call_id; duplicates are dropped.
    let in_flight: Arc<DashSet<String>> = Arc::new(DashSet::new());

    while let Some(message) = upstream_rx.recv().await {
        deps.touch();
        let text = match message {
            WireMessage::Binary(bytes) => {
                if browser_tx.send(WireMessage::Binary(bytes)).await.is_err() {
                    break;
                }
                continue;
            }
            WireMessage::Text(text) => text,
        };

        let event: Value = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(session = %deps.ctx.session_id, error = %e, "Dropping malformed upstream event");
                metrics::record_malformed_event();
                continue;
            }
        };

        match events::event_type(&event) {
            Some(types::FUNCTION_CALL_DONE) => {
                let Some(call) = ToolCallEvent::from_event(&event) else {
                    tracing::warn!(session = %deps.ctx.session_id, "Dropping tool-call event without call_id/name");
                    metrics::record_malformed_event();
                    continue;
                };
                if !in_flight.insert(call.call_id.clone()) {
                    tracing::warn!(session = %deps.ctx.session_id, call_id = %call.call_id, "Duplicate tool call dropped");
                    continue;
                }
                spawn_tool_task(
                    call,
                    deps.clone(),
                    browser_tx.clone(),
                    upstream_tx.clone(),
                    in_flight.clone(),
                );
            }
            Some(types::ERROR) => {
                tracing::error!(session = %deps.ctx.session_id, event = %text, "Upstream error event");
                if browser_tx.send(WireMessage::Text(text)).await.is_err() {
                    break;
                }
            }
            _ => {
                if browser_tx.send(WireMessage::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Run one tool call off the pump so slow tools never stall audio.
///
/// The function output is always injected before the `response.create` that
/// follows it; both go through the same channel so FIFO gives the ordering.
/// A handoff additionally notifies the browser after the persona's delay, so
/// the in-progress utterance can finish first.
fn spawn_tool_task(
    call: ToolCallEvent,
    deps: Arc<RelayDeps>,
    browser_tx: mpsc::Sender<WireMessage>,
    upstream_tx: mpsc::Sender<WireMessage>,
    in_flight: Arc<DashSet<String>>,
) {
    tokio::spawn(async move {
        metrics::record_tool_call(&call.name);
        let outcome = deps
            .tools
            .dispatch(&deps.ctx, &call.name, &call.arguments)
            .await;

        let (output, handoff_target) = match outcome {
            ToolOutcome::Text(text) => (text, None),
            ToolOutcome::Handoff { target } => (
                "Understood. Transferring the caller now.".to_string(),
                Some(target),
            ),
        };

        let output_msg = events::function_call_output(&call.call_id, &output).to_string();
        if upstream_tx.send(WireMessage::Text(output_msg)).await.is_err() {
            in_flight.remove(&call.call_id);
            return;
        }
        let _ = upstream_tx
            .send(WireMessage::Text(events::response_create().to_string()))
            .await;

        in_flight.remove(&call.call_id);

        if let Some(target) = handoff_target {
            metrics::record_handoff(target.persona_key());
            tokio::time::sleep(Duration::from_millis(deps.handoff_delay_ms)).await;
            let event = voice_gateway_agent::handoff_event(target).to_string();
            if browser_tx.send(WireMessage::Text(event)).await.is_err() {
                tracing::debug!(session = %deps.ctx.session_id, "Browser gone before handoff notification");
            }
            // The browser reconnects as a fresh session; this one closes when
            // it drops the socket.
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use voice_gateway_config::ToolSchema;
    use voice_gateway_core::AgentRole;
    use voice_gateway_tools::{Tool, ToolError};

    struct CountingTool {
        calls: Arc<AtomicUsize>,
        outcome_handoff: bool,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            "search_knowledge_base"
        }
        fn description(&self) -> &str {
            "test stand-in"
        }
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: self.name().to_string(),
                description: self.description().to_string(),
                arguments: BTreeMap::new(),
            }
        }
        async fn execute(
            &self,
            _ctx: &SessionContext,
            _args: Value,
        ) -> Result<ToolOutcome, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.outcome_handoff {
                Ok(ToolOutcome::Handoff {
                    target: AgentRole::General,
                })
            } else {
                Ok(ToolOutcome::Text("[How to freeze a card]\nTap freeze.".to_string()))
            }
        }
    }

    struct Harness {
        upstream_in: mpsc::Sender<WireMessage>,
        browser_out: mpsc::Receiver<WireMessage>,
        upstream_out: mpsc::Receiver<WireMessage>,
        calls: Arc<AtomicUsize>,
    }

    fn test_deps(registry: ToolRegistry, handoff_delay_ms: u64) -> Arc<RelayDeps> {
        Arc::new(RelayDeps {
            ctx: SessionContext::new("s1", AgentRole::General, None, "Guest"),
            tools: Arc::new(registry),
            sessions: Arc::new(SessionManager::new(8)),
            handoff_delay_ms,
        })
    }

    fn harness(outcome_handoff: bool, handoff_delay_ms: u64) -> Harness {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ToolRegistry::new();
        registry.register(CountingTool {
            calls: calls.clone(),
            outcome_handoff,
        });

        let deps = test_deps(registry, handoff_delay_ms);

        let (upstream_in_tx, upstream_in_rx) = mpsc::channel(32);
        let (browser_out_tx, browser_out_rx) = mpsc::channel(32);
        let (upstream_out_tx, upstream_out_rx) = mpsc::channel(32);

        tokio::spawn(pump_down(
            upstream_in_rx,
            browser_out_tx,
            upstream_out_tx,
            deps,
        ));

        Harness {
            upstream_in: upstream_in_tx,
            browser_out: browser_out_rx,
            upstream_out: upstream_out_rx,
            calls,
        }
    }

    fn tool_call_event(call_id: &str) -> String {
        json!({
            "type": "response.function_call_arguments.done",
            "call_id": call_id,
            "name": "search_knowledge_base",
            "arguments": "{}",
        })
        .to_string()
    }

    async fn recv_text(rx: &mut mpsc::Receiver<WireMessage>) -> Value {
        match tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed")
        {
            WireMessage::Text(text) => serde_json::from_str(&text).unwrap(),
            WireMessage::Binary(_) => panic!("unexpected binary frame"),
        }
    }

    #[tokio::test]
    async fn test_pump_up_forwards_verbatim() {
        let (browser_tx, browser_rx) = mpsc::channel(8);
        let (upstream_tx, mut upstream_rx) = mpsc::channel(8);
        tokio::spawn(pump_up(browser_rx, upstream_tx, test_deps(ToolRegistry::new(), 1500)));

        browser_tx
            .send(WireMessage::Text("{\"type\":\"input_audio_buffer.append\",\"audio\":\"AAAA\"}".to_string()))
            .await
            .unwrap();
        browser_tx
            .send(WireMessage::Binary(vec![1, 2, 3]))
            .await
            .unwrap();

        assert!(matches!(upstream_rx.recv().await.unwrap(), WireMessage::Text(_)));
        assert_eq!(
            upstream_rx.recv().await.unwrap(),
            WireMessage::Binary(vec![1, 2, 3])
        );
    }

    #[tokio::test]
    async fn test_pump_traffic_touches_session() {
        let deps = test_deps(ToolRegistry::new(), 1500);
        deps.sessions
            .insert(crate::session::SessionInfo::new(
                "s1",
                AgentRole::General,
                "Guest",
            ))
            .unwrap();
        let before = deps.sessions.snapshot()[0].last_activity;

        let (browser_tx, browser_rx) = mpsc::channel(8);
        let (upstream_tx, mut upstream_rx) = mpsc::channel(8);
        tokio::spawn(pump_up(browser_rx, upstream_tx, deps.clone()));

        tokio::time::sleep(Duration::from_millis(5)).await;
        browser_tx
            .send(WireMessage::Binary(vec![0, 0]))
            .await
            .unwrap();
        upstream_rx.recv().await.unwrap();

        let after = deps.sessions.snapshot()[0].last_activity;
        assert!(after > before, "forwarded traffic must touch the session");
    }

    #[tokio::test]
    async fn test_intercepts_tool_call_and_injects_output() {
        let mut h = harness(false, 1500);

        h.upstream_in
            .send(WireMessage::Text(tool_call_event("c1")))
            .await
            .unwrap();

        // Upstream sees the output first, then the generation trigger.
        let output = recv_text(&mut h.upstream_out).await;
        assert_eq!(output["type"], "conversation.item.create");
        assert_eq!(output["item"]["type"], "function_call_output");
        assert_eq!(output["item"]["call_id"], "c1");
        assert!(output["item"]["output"]
            .as_str()
            .unwrap()
            .contains("How to freeze a card"));

        let trigger = recv_text(&mut h.upstream_out).await;
        assert_eq!(trigger["type"], "response.create");

        // The browser never observes the intercepted event.
        h.upstream_in
            .send(WireMessage::Text(json!({"type": "response.done"}).to_string()))
            .await
            .unwrap();
        let seen = recv_text(&mut h.browser_out).await;
        assert_eq!(seen["type"], "response.done");

        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_forwards_speech_started_and_other_events() {
        let mut h = harness(false, 1500);

        for event_type in [
            "input_audio_buffer.speech_started",
            "response.audio.delta",
            "session.created",
            "error",
        ] {
            h.upstream_in
                .send(WireMessage::Text(json!({"type": event_type}).to_string()))
                .await
                .unwrap();
            let seen = recv_text(&mut h.browser_out).await;
            assert_eq!(seen["type"], event_type);
        }
    }

    #[tokio::test]
    async fn test_binary_frames_forwarded_verbatim() {
        let mut h = harness(false, 1500);

        h.upstream_in
            .send(WireMessage::Binary(vec![9, 9, 9]))
            .await
            .unwrap();
        let seen = tokio::time::timeout(Duration::from_secs(2), h.browser_out.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seen, WireMessage::Binary(vec![9, 9, 9]));
    }

    #[tokio::test]
    async fn test_malformed_json_dropped_not_fatal() {
        let mut h = harness(false, 1500);

        h.upstream_in
            .send(WireMessage::Text("{broken".to_string()))
            .await
            .unwrap();
        // The pump survives: the next event still flows.
        h.upstream_in
            .send(WireMessage::Text(json!({"type": "session.updated"}).to_string()))
            .await
            .unwrap();
        let seen = recv_text(&mut h.browser_out).await;
        assert_eq!(seen["type"], "session.updated");
    }

    #[tokio::test]
    async fn test_duplicate_call_id_runs_once() {
        let mut h = harness(false, 1500);

        h.upstream_in
            .send(WireMessage::Text(tool_call_event("dup")))
            .await
            .unwrap();
        h.upstream_in
            .send(WireMessage::Text(tool_call_event("dup")))
            .await
            .unwrap();

        // Exactly one output + trigger pair.
        let output = recv_text(&mut h.upstream_out).await;
        assert_eq!(output["item"]["call_id"], "dup");
        let trigger = recv_text(&mut h.upstream_out).await;
        assert_eq!(trigger["type"], "response.create");

        // Give a would-be second task time to appear, then confirm silence.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(h.upstream_out.try_recv().is_err());
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handoff_notifies_browser_after_delay() {
        let mut h = harness(true, 1500);

        h.upstream_in
            .send(WireMessage::Text(tool_call_event("h1")))
            .await
            .unwrap();

        // Function output and trigger flow upstream as for any tool.
        let output = recv_text(&mut h.upstream_out).await;
        assert_eq!(output["item"]["call_id"], "h1");
        let trigger = recv_text(&mut h.upstream_out).await;
        assert_eq!(trigger["type"], "response.create");

        // After the persona delay (time is paused and auto-advances), the
        // browser receives the handoff event.
        let handoff = recv_text(&mut h.browser_out).await;
        assert_eq!(handoff["type"], "agent.handoff");
        assert_eq!(handoff["target_agent"], "A");
        assert!(handoff["message"].as_str().is_some());
    }
}
