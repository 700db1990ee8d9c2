//! Core types for the voice gateway
//!
//! This crate provides the vocabulary shared by every other crate:
//! - Session identity and agent roles
//! - The realtime event model (typed envelope over JSON events)
//! - PCM16 audio codec helpers

pub mod audio;
pub mod events;
pub mod session;

pub use audio::{
    decode_pcm16_le, encode_pcm16_le, f32_to_pcm16, pcm16_bytes_to_f32, pcm16_to_f32,
    samples_to_pcm16_bytes, GATEWAY_SAMPLE_RATE_HZ,
};
pub use events::{event_type, function_call_output, response_create, ToolCallEvent};
pub use session::{AgentRole, SessionContext};
