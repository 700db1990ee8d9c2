//! Client-side audio pipeline
//!
//! The capture path takes microphone audio at its native rate, downmixes to
//! mono, resamples to the 24 kHz wire rate, and frames it into base64
//! `input_audio_buffer.append` events. The playback path queues decoded
//! down-frames, smooths chunk edges with short fades, and supports barge-in:
//! pending audio is discarded the moment the user starts speaking.

pub mod capture;
pub mod client;
pub mod playback;
pub mod resample;

pub use capture::{downmix_to_mono, FrameAssembler, FRAME_SAMPLES};
pub use client::{ClientAction, VoiceClient};
pub use playback::{hold_tone, silence_flush, PlaybackQueue};
pub use resample::LinearResampler;
