//! A minimal `Transport` that prints to stdout. Stands in for the real
//! ALSA/websocket/DAP framing that lives outside this repository, so the
//! LOCAL session has something to push output through from a terminal.

use aura_domain::transport::{StreamEndReason, Transport, TranscriptRole};
use std::io::Write;
use std::sync::Mutex;

pub struct StdioTransport {
    stream_open: Mutex<bool>,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            stream_open: Mutex::new(false),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for StdioTransport {
    fn send_stream_start(&self, _stream_id: u64) {
        *self.stream_open.lock().unwrap() = true;
    }

    fn send_stream_delta(&self, _stream_id: u64, utf8_chunk: &str) {
        print!("{utf8_chunk}");
        let _ = std::io::stdout().flush();
    }

    fn send_stream_end(&self, _stream_id: u64, reason: StreamEndReason) {
        *self.stream_open.lock().unwrap() = false;
        println!();
        if reason != StreamEndReason::Complete {
            println!("[stream ended: {reason}]");
        }
    }

    fn send_transcript(&self, role: TranscriptRole, text: &str) {
        let label = match role {
            TranscriptRole::User => "user",
            TranscriptRole::Assistant => "assistant",
            TranscriptRole::System => "system",
            TranscriptRole::Tool => "tool",
        };
        println!("[{label}] {text}");
    }

    fn send_state(&self, state: &str, detail: Option<&str>) {
        match detail {
            Some(detail) => tracing::debug!(state, detail, "transport state"),
            None => tracing::debug!(state, "transport state"),
        }
    }

    fn send_audio_pcm(&self, _samples: &[i16], _sample_rate: u32) {
        tracing::warn!("stdio transport cannot play PCM audio");
    }

    fn send_error(&self, code: &str, message: &str) {
        eprintln!("[error {code}] {message}");
    }
}
