//! Streaming Filter (§4.6): strips `<command>...</command>` segments from a
//! chunked LLM token stream before it reaches the transport.
//!
//! Across one turn, the emitted bytes equal the input stream minus every
//! `<command>...</command>` region and any residue after the first
//! unterminated `<command>`.

use aura_providers::traits::ChunkSink;
use aura_sessions::SessionHandle;
use std::sync::Arc;

const OPEN_TAG: &str = "<command>";

/// Sink passed to `LlmProvider::chat_stream`. Wraps a transport delivery
/// closure and the session's turn-exclusive streaming state (§3).
pub struct StreamingFilter<'a> {
    session: &'a Arc<aura_sessions::SessionRecord>,
    stream_id: u64,
    /// Holds back a short tail of the visible stream so a `<command>` tag
    /// straddling a chunk boundary is still detected (§4.6 edge cases).
    carry: String,
    on_visible: Box<dyn FnMut(&str) + 'a>,
}

impl<'a> StreamingFilter<'a> {
    pub fn new(session: &'a SessionHandle, stream_id: u64, on_visible: impl FnMut(&str) + 'a) -> Self {
        Self {
            session,
            stream_id,
            carry: String::new(),
            on_visible: Box::new(on_visible),
        }
    }

    fn emit_visible(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let first_byte = self.session.with_streaming_state_mut(|s| {
            let was_empty = !s.stream_had_content;
            s.stream_had_content = true;
            was_empty
        });
        if first_byte {
            self.session.with_streaming_state_mut(|s| s.llm_streaming_active = true);
            if let Some(transport) = self.session.transport() {
                transport.send_stream_start(self.stream_id);
            }
        }
        if let Some(transport) = self.session.transport() {
            transport.send_stream_delta(self.stream_id, text);
        }
        (self.on_visible)(text);
    }

    /// Flushes any bytes still held back as a possible `<command>` prefix.
    /// Must be called once the underlying stream is exhausted: a stream that
    /// legitimately ends mid-prefix (e.g. trailing `"...<c"`) would otherwise
    /// have those bytes silently dropped rather than emitted as plain text.
    /// A no-op if the stream ended inside an actual command tag.
    pub fn finish(&mut self) {
        if self.session.with_streaming_state_mut(|s| s.in_command_tag) {
            return;
        }
        if !self.carry.is_empty() {
            let residual = std::mem::take(&mut self.carry);
            self.emit_visible(&residual);
        }
    }
}

impl ChunkSink for StreamingFilter<'_> {
    fn on_chunk(&mut self, text: &str) {
        if self.session.with_streaming_state_mut(|s| s.in_command_tag) {
            return;
        }

        self.carry.push_str(text);

        // Keep scanning until either we find the tag or we've confirmed the
        // tail can't contain a partial prefix of it.
        if let Some(pos) = self.carry.find(OPEN_TAG) {
            let visible = self.carry[..pos].to_string();
            self.emit_visible(&visible);
            self.session.with_streaming_state_mut(|s| {
                s.in_command_tag = true;
                s.stream_had_content = true;
            });
            aura_domain::trace::TraceEvent::StreamCommandTagOpened {
                session_id: self.session.session_id,
                stream_id: self.stream_id,
            }
            .emit();
            self.carry.clear();
            return;
        }

        // No complete tag yet. Flush everything except a tail that could
        // still be the start of "<command>".
        let keep = longest_suffix_prefix_of_tag(&self.carry);
        let split_at = self.carry.len() - keep;
        if split_at > 0 {
            let visible: String = self.carry.drain(..split_at).collect();
            self.emit_visible(&visible);
        }
    }
}

/// Length of the longest suffix of `s` that is also a prefix of `OPEN_TAG`
/// (so we never flush a partial tag boundary).
fn longest_suffix_prefix_of_tag(s: &str) -> usize {
    let max = OPEN_TAG.len().min(s.len());
    for len in (1..=max).rev() {
        if s.ends_with(&OPEN_TAG[..len]) {
            return len;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_sessions::{SessionKind, SessionRecord};
    use chrono::Utc;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn new_session() -> SessionHandle {
        Arc::new(SessionRecord::new(1, SessionKind::Web, None, Utc::now()))
    }

    #[test]
    fn emits_plain_text_unchanged() {
        let session = new_session();
        let collected = Rc::new(RefCell::new(String::new()));
        let sink_collected = collected.clone();
        let mut filter = StreamingFilter::new(&session, 1, move |t| sink_collected.borrow_mut().push_str(t));
        filter.on_chunk("Hi there.");
        assert_eq!(*collected.borrow(), "Hi there.");
    }

    #[test]
    fn strips_command_tag_and_everything_after() {
        let session = new_session();
        let collected = Rc::new(RefCell::new(String::new()));
        let sink_collected = collected.clone();
        let mut filter = StreamingFilter::new(&session, 1, move |t| sink_collected.borrow_mut().push_str(t));
        filter.on_chunk("Sure, ");
        filter.on_chunk("<command>get_weather(city=SF)</command> ignored tail");
        assert_eq!(*collected.borrow(), "Sure, ");
        assert!(session.streaming_state().in_command_tag);
    }

    #[test]
    fn tag_straddling_chunk_boundary_is_still_detected() {
        let session = new_session();
        let collected = Rc::new(RefCell::new(String::new()));
        let sink_collected = collected.clone();
        let mut filter = StreamingFilter::new(&session, 1, move |t| sink_collected.borrow_mut().push_str(t));
        filter.on_chunk("prefix<comm");
        filter.on_chunk("and>rest");
        assert_eq!(*collected.borrow(), "prefix");
        assert!(session.streaming_state().in_command_tag);
    }

    #[test]
    fn once_in_command_tag_further_chunks_are_discarded() {
        let session = new_session();
        let collected = Rc::new(RefCell::new(String::new()));
        let sink_collected = collected.clone();
        let mut filter = StreamingFilter::new(&session, 1, move |t| sink_collected.borrow_mut().push_str(t));
        filter.on_chunk("<command>x");
        filter.on_chunk("more stuff that must never appear");
        assert_eq!(*collected.borrow(), "");
    }

    #[test]
    fn finish_flushes_a_trailing_partial_tag_prefix() {
        let session = new_session();
        let collected = Rc::new(RefCell::new(String::new()));
        let sink_collected = collected.clone();
        let mut filter = StreamingFilter::new(&session, 1, move |t| sink_collected.borrow_mut().push_str(t));
        filter.on_chunk("all done...<c");
        assert_eq!(*collected.borrow(), "all done...");
        filter.finish();
        assert_eq!(*collected.borrow(), "all done...<c");
    }

    #[test]
    fn finish_is_a_no_op_once_a_real_tag_opened() {
        let session = new_session();
        let collected = Rc::new(RefCell::new(String::new()));
        let sink_collected = collected.clone();
        let mut filter = StreamingFilter::new(&session, 1, move |t| sink_collected.borrow_mut().push_str(t));
        filter.on_chunk("hi <command>x");
        filter.finish();
        assert_eq!(*collected.borrow(), "hi ");
    }
}
