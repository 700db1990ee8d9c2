//! PCM16 audio codec helpers
//!
//! All audio crossing the gateway is PCM16 little-endian, mono, 24 kHz.
//! Internally samples are carried as f32 in [-1.0, 1.0]; conversion to and
//! from the wire format lives here so capture, playback and tests agree on
//! the rounding rules.

/// Wire sample rate on both legs of the relay.
pub const GATEWAY_SAMPLE_RATE_HZ: u32 = 24_000;

/// Convert a float sample in [-1.0, 1.0] to PCM16.
///
/// Out-of-range input saturates rather than wraps.
#[inline]
pub fn f32_to_pcm16(sample: f32) -> i16 {
    let scaled = (sample * 32768.0).round();
    scaled.clamp(-32768.0, 32767.0) as i16
}

/// Convert a PCM16 sample back to float.
#[inline]
pub fn pcm16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

/// Serialize PCM16 samples to little-endian bytes.
pub fn encode_pcm16_le(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    bytes
}

/// Deserialize little-endian bytes to PCM16 samples. A trailing odd byte is
/// dropped.
pub fn decode_pcm16_le(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Decode PCM16 LE bytes straight to float samples.
pub fn pcm16_bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| pcm16_to_f32(i16::from_le_bytes([pair[0], pair[1]])))
        .collect()
}

/// Encode float samples straight to PCM16 LE bytes.
pub fn samples_to_pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        bytes.extend_from_slice(&f32_to_pcm16(s).to_le_bytes());
    }
    bytes
}
