//! Client session coordinator
//!
//! Glues the capture and playback halves to the event stream of one gateway
//! session. The surrounding platform code owns the actual microphone and
//! speaker devices plus the WebSocket; this type decides what to do with
//! each buffer and event, which keeps the whole client behavior testable.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;

use voice_gateway_core::audio::GATEWAY_SAMPLE_RATE_HZ;
use voice_gateway_core::events::{event_type, types};

use crate::capture::{downmix_to_mono, FrameAssembler};
use crate::playback::{hold_tone, PlaybackQueue};
use crate::resample::LinearResampler;

/// What the platform layer must do in response to a server event.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    /// Schedule these samples on the output device right away, ahead of the
    /// queue (barge-in silence flush, hold tone).
    PlayNow(Vec<f32>),
    /// Stop the currently playing source immediately.
    StopCurrentSource,
    /// Tear the session down and reconnect under the other role.
    Reconnect {
        /// Attach the stored bearer token on reconnect (target role B);
        /// false means reconnect anonymously and clear the stored token.
        with_token: bool,
    },
}

/// Per-session client state.
pub struct VoiceClient {
    resampler: LinearResampler,
    assembler: FrameAssembler,
    playback: PlaybackQueue,
    channels: usize,
}

impl VoiceClient {
    /// `src_rate_hz` is the microphone's native rate (typically 48 kHz),
    /// `channels` its interleaved channel count.
    pub fn new(src_rate_hz: u32, channels: usize) -> Self {
        Self {
            resampler: LinearResampler::new(src_rate_hz, GATEWAY_SAMPLE_RATE_HZ),
            assembler: FrameAssembler::new(),
            playback: PlaybackQueue::new(),
            channels: channels.max(1),
        }
    }

    /// Feed one microphone buffer; returns the append events to send to the
    /// gateway. An empty buffer yields no events.
    pub fn on_microphone(&mut self, samples: &[f32]) -> Vec<Value> {
        if samples.is_empty() {
            return Vec::new();
        }
        let mono = downmix_to_mono(samples, self.channels);
        let resampled = self.resampler.process(&mono);
        self.assembler.push(&resampled)
    }

    /// Handle one event from the gateway. Down-frame audio lands in the
    /// playback queue; control events return actions for the platform layer.
    pub fn on_server_event(&mut self, event: &Value) -> Vec<ClientAction> {
        match event_type(event) {
            Some(types::AUDIO_DELTA) => {
                if let Some(encoded) = event.get("delta").and_then(Value::as_str) {
                    match BASE64.decode(encoded) {
                        Ok(bytes) => self.playback.enqueue_pcm16(&bytes),
                        Err(_) => {
                            // A corrupt frame is not worth killing the
                            // session over.
                        }
                    }
                }
                Vec::new()
            }
            Some(types::SPEECH_STARTED) => {
                // Barge-in: drop pending audio, stop the active source, and
                // flush a little silence through the output.
                let flush = self.playback.barge_in();
                vec![
                    ClientAction::StopCurrentSource,
                    ClientAction::PlayNow(flush),
                ]
            }
            Some(types::RESPONSE_DONE) => {
                // The interrupted response is over; stop suppressing
                // stragglers so the next response plays.
                self.playback.resume();
                Vec::new()
            }
            Some(types::AGENT_HANDOFF) => {
                let with_token = event
                    .get("target_agent")
                    .and_then(Value::as_str)
                    .map(|t| t == "B")
                    .unwrap_or(false);
                vec![
                    ClientAction::PlayNow(hold_tone()),
                    ClientAction::Reconnect { with_token },
                ]
            }
            _ => Vec::new(),
        }
    }

    /// Next faded chunk for the playback worker, if any.
    pub fn next_playback_chunk(&mut self) -> Option<Vec<f32>> {
        self.playback.next_chunk()
    }

    /// Pending down-frames not yet played.
    pub fn queued_frames(&self) -> usize {
        self.playback.pending()
    }
}
