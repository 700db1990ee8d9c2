//! Capture path: downmix, framing, append events

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};

use voice_gateway_core::audio::samples_to_pcm16_bytes;
use voice_gateway_core::events::types;

/// Samples per up-frame at the 24 kHz wire rate (200 ms).
pub const FRAME_SAMPLES: usize = 4800;

/// Smallest partial frame worth sending on flush (20 ms).
const MIN_FLUSH_SAMPLES: usize = 480;

/// Average interleaved multi-channel audio down to mono. Mono input is
/// returned unchanged.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Accumulates resampled mono samples and emits `input_audio_buffer.append`
/// events of exactly [`FRAME_SAMPLES`] samples.
#[derive(Default)]
pub struct FrameAssembler {
    buffer: Vec<f32>,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed samples; returns zero or more ready events. Empty input never
    /// produces an event.
    pub fn push(&mut self, samples: &[f32]) -> Vec<Value> {
        self.buffer.extend_from_slice(samples);

        let mut events = Vec::new();
        while self.buffer.len() >= FRAME_SAMPLES {
            let frame: Vec<f32> = self.buffer.drain(..FRAME_SAMPLES).collect();
            events.push(append_event(&frame));
        }
        events
    }

    /// Emit whatever remains, if it is at least a 20 ms frame; shorter
    /// residue is dropped.
    pub fn flush(&mut self) -> Option<Value> {
        let residue: Vec<f32> = self.buffer.drain(..).collect();
        if residue.len() >= MIN_FLUSH_SAMPLES {
            Some(append_event(&residue))
        } else {
            None
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Wrap PCM16 samples in a base64 append event.
fn append_event(samples: &[f32]) -> Value {
    let bytes = samples_to_pcm16_bytes(samples);
    json!({
        "type": types::AUDIO_APPEND,
        "audio": BASE64.encode(bytes),
    })
}
