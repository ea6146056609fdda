//! Minimal `Transport` used only by this crate's own tests.

use aura_domain::transport::{StreamEndReason, TranscriptRole, Transport};

pub struct NullTransport;

impl Transport for NullTransport {
    fn send_stream_start(&self, _stream_id: u64) {}
    fn send_stream_delta(&self, _stream_id: u64, _utf8_chunk: &str) {}
    fn send_stream_end(&self, _stream_id: u64, _reason: StreamEndReason) {}
    fn send_transcript(&self, _role: TranscriptRole, _text: &str) {}
    fn send_state(&self, _state: &str, _detail: Option<&str>) {}
    fn send_audio_pcm(&self, _samples: &[i16], _sample_rate: u32) {}
    fn send_error(&self, _code: &str, _message: &str) {}
}
