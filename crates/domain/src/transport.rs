//! The interface the core exposes to transports (§6 "From the core, to
//! transports"). A transport is ALSA/websocket/DAP framing, or anything
//! else that can push output to a client; this crate never implements one.

use std::fmt;

/// Reason a stream ended, mirroring `{"complete","error","cancelled"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEndReason {
    Complete,
    Error,
    Cancelled,
}

impl fmt::Display for StreamEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamEndReason::Complete => "complete",
            StreamEndReason::Error => "error",
            StreamEndReason::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Non-streaming transcript role, mirrors `{"user","assistant","system","tool"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptRole {
    User,
    Assistant,
    System,
    Tool,
}

/// Opaque handle a worker uses to push output toward one client.
///
/// Implementations live outside this crate (ALSA/PulseAudio, WebSocket,
/// DAP framing — all out of scope per the purpose statement). `fd_mutex`
/// guards swapping this out on reconnect.
pub trait Transport: Send + Sync {
    fn send_stream_start(&self, stream_id: u64);
    fn send_stream_delta(&self, stream_id: u64, utf8_chunk: &str);
    fn send_stream_end(&self, stream_id: u64, reason: StreamEndReason);
    /// Non-streaming fallback: a whole transcript line at once.
    fn send_transcript(&self, role: TranscriptRole, text: &str);
    fn send_state(&self, state: &str, detail: Option<&str>);
    /// For satellites needing server-side TTS.
    fn send_audio_pcm(&self, samples: &[i16], sample_rate: u32);
    fn send_error(&self, code: &str, message: &str);
}
