//! Shared SSE framing for the blocking provider adapters.
//!
//! Every provider follows the same pattern: read bytes off a blocking
//! `reqwest::blocking::Response`, buffer them, split on `\n\n`, and extract
//! `data:` payloads. This module owns that framing; `openai_wire`/`anthropic`
//! own interpreting the payloads.

use std::io::Read;

/// Extract complete `data:` payloads from an SSE buffer, draining consumed
/// bytes in place. Any trailing partial event remains for the next call.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut data_lines = Vec::new();

    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos).collect();
        buffer.drain(..2);

        for line in block.lines() {
            let line = line.trim();
            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    data_lines.push(data.to_string());
                }
            }
        }
    }

    data_lines
}

/// Read an SSE body to completion, calling `on_data` for each payload in
/// order. Blocks the calling thread until the response closes.
///
/// A multi-byte UTF-8 character can straddle two reads, so raw bytes are
/// held in `pending_bytes` until they form complete characters rather than
/// being lossy-converted one read at a time.
pub(crate) fn read_sse_blocking<R: Read>(
    mut reader: R,
    mut on_data: impl FnMut(&str),
) -> std::io::Result<()> {
    let mut buffer = String::new();
    let mut pending_bytes: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            if !pending_bytes.is_empty() {
                buffer.push_str(&String::from_utf8_lossy(&pending_bytes));
                pending_bytes.clear();
            }
            if !buffer.trim().is_empty() {
                buffer.push_str("\n\n");
                for data in drain_data_lines(&mut buffer) {
                    on_data(&data);
                }
            }
            break;
        }

        pending_bytes.extend_from_slice(&chunk[..n]);
        match std::str::from_utf8(&pending_bytes) {
            Ok(valid) => {
                buffer.push_str(valid);
                pending_bytes.clear();
            }
            Err(e) => {
                let valid_len = e.valid_up_to();
                let valid = std::str::from_utf8(&pending_bytes[..valid_len]).expect("checked valid_up_to");
                buffer.push_str(valid);
                pending_bytes.drain(..valid_len);
            }
        }

        for data in drain_data_lines(&mut buffer) {
            on_data(&data);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_single_complete_event() {
        let mut buf = String::from("event: message\ndata: {\"hello\":\"world\"}\n\n");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["{\"hello\":\"world\"}"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_multiple_events() {
        let mut buf = String::from("data: first\n\ndata: second\n\n");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn drain_partial_event_stays_in_buffer() {
        let mut buf = String::from("data: complete\n\ndata: partial");
        let lines = drain_data_lines(&mut buf);
        assert_eq!(lines, vec!["complete"]);
        assert_eq!(buf, "data: partial");
    }

    #[test]
    fn read_sse_blocking_over_cursor() {
        let body = "data: {\"a\":1}\n\ndata: {\"a\":2}\n\n";
        let cursor = std::io::Cursor::new(body.as_bytes());
        let mut seen = Vec::new();
        read_sse_blocking(cursor, |d| seen.push(d.to_string())).unwrap();
        assert_eq!(seen, vec!["{\"a\":1}", "{\"a\":2}"]);
    }

    /// Yields its bytes one at a time, so any multi-byte UTF-8 character
    /// in the body is guaranteed to straddle two separate `read()` calls.
    struct OneByteAtATime(std::collections::VecDeque<u8>);

    impl Read for OneByteAtATime {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.pop_front() {
                Some(byte) => {
                    buf[0] = byte;
                    Ok(1)
                }
                None => Ok(0),
            }
        }
    }

    #[test]
    fn read_sse_blocking_reassembles_multibyte_char_split_across_reads() {
        let body = "data: caf\u{e9} \u{2603}\n\n".as_bytes().to_vec();
        let reader = OneByteAtATime(body.into_iter().collect());
        let mut seen = Vec::new();
        read_sse_blocking(reader, |d| seen.push(d.to_string())).unwrap();
        assert_eq!(seen, vec!["caf\u{e9} \u{2603}"]);
    }

    #[test]
    fn read_sse_blocking_flushes_trailing_partial() {
        // No trailing \n\n on the last event; flush-on-EOF path should still
        // surface it.
        let body = "data: {\"a\":1}\n\n";
        let cursor = std::io::Cursor::new(body.as_bytes());
        let mut seen = Vec::new();
        read_sse_blocking(cursor, |d| seen.push(d.to_string())).unwrap();
        assert_eq!(seen, vec!["{\"a\":1}"]);
    }
}
