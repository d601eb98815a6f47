//! Incremental decoder for `text/event-stream` bodies.
//!
//! The log-stream transport reads raw response chunks off the wire; chunk
//! boundaries fall anywhere, including mid-line and mid-codepoint. The
//! decoder buffers unconsumed bytes and yields one payload string per
//! complete event, in wire order. It performs no I/O, which keeps the
//! framing rules unit-testable without a connection.

/// Streaming SSE decoder.
///
/// Feed it byte chunks as they arrive; it returns the data payloads of every
/// event completed by that chunk. Framing rules honoured:
///
/// * events are delimited by a blank line;
/// * only `data` fields contribute to the payload; multiple `data` lines in
///   one event are joined with `\n`;
/// * a single space after the `:` separator is stripped;
/// * lines starting with `:` are comments and are ignored;
/// * `\r\n` and bare `\r`-free `\n` line endings are both accepted;
/// * other fields (`event`, `id`, `retry`) are ignored -- the backend emits
///   freeform text lines with no structured schema.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    /// Unconsumed bytes, possibly ending mid-line or mid-codepoint.
    buf: Vec<u8>,
    /// `data` lines of the event currently being assembled.
    data: Vec<String>,
}

impl SseDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Consume one wire chunk and return the payloads of all events it
    /// completes, in arrival order.
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut consumed = 0;
        while let Some(nl) = self.buf[consumed..].iter().position(|&b| b == b'\n') {
            let mut line = &self.buf[consumed..consumed + nl];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            // Lossy conversion: a malformed byte sequence inside a complete
            // line is the server's bug, not a reason to stall the stream.
            let line = String::from_utf8_lossy(line).into_owned();
            self.process_line(&line, &mut events);
            consumed += nl + 1;
        }
        self.buf.drain(..consumed);
        events
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<String>) {
        if line.is_empty() {
            // Blank line: dispatch the pending event, if any.
            if !self.data.is_empty() {
                events.push(self.data.join("\n"));
                self.data.clear();
            }
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            // A line without a colon is a field name with an empty value.
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_event_single_chunk() {
        let mut dec = SseDecoder::new();
        assert_eq!(dec.feed(b"data: hello\n\n"), vec!["hello".to_string()]);
    }

    #[test]
    fn event_split_across_chunks_mid_line() {
        let mut dec = SseDecoder::new();
        assert!(dec.feed(b"data: hel").is_empty());
        assert!(dec.feed(b"lo\n").is_empty());
        assert_eq!(dec.feed(b"\n"), vec!["hello".to_string()]);
    }

    #[test]
    fn multibyte_marker_split_across_chunks() {
        // "✓" is three bytes; split it down the middle.
        let wire = "data: Step 1 ✓\n\n".as_bytes();
        let mut dec = SseDecoder::new();
        assert!(dec.feed(&wire[..9]).is_empty());
        assert_eq!(dec.feed(&wire[9..]), vec!["Step 1 ✓".to_string()]);
    }

    #[test]
    fn multiple_data_lines_join_with_newline() {
        let mut dec = SseDecoder::new();
        assert_eq!(
            dec.feed(b"data: first\ndata: second\n\n"),
            vec!["first\nsecond".to_string()]
        );
    }

    #[test]
    fn comments_and_foreign_fields_are_ignored() {
        let mut dec = SseDecoder::new();
        let events = dec.feed(b": keep-alive\nevent: progress\nid: 7\nretry: 500\ndata: line\n\n");
        assert_eq!(events, vec!["line".to_string()]);
    }

    #[test]
    fn crlf_line_endings_are_accepted() {
        let mut dec = SseDecoder::new();
        assert_eq!(dec.feed(b"data: hi\r\n\r\n"), vec!["hi".to_string()]);
    }

    #[test]
    fn no_space_after_colon() {
        let mut dec = SseDecoder::new();
        assert_eq!(dec.feed(b"data:tight\n\n"), vec!["tight".to_string()]);
    }

    #[test]
    fn several_events_in_one_chunk_preserve_order_and_duplicates() {
        let mut dec = SseDecoder::new();
        let events = dec.feed(b"data: a\n\ndata: a\n\ndata: b\n\n");
        assert_eq!(
            events,
            vec!["a".to_string(), "a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn blank_lines_without_pending_data_dispatch_nothing() {
        let mut dec = SseDecoder::new();
        assert!(dec.feed(b"\n\n\n").is_empty());
        assert!(dec.feed(b": ping\n\n").is_empty());
    }

    #[test]
    fn bare_data_field_yields_empty_payload() {
        let mut dec = SseDecoder::new();
        assert_eq!(dec.feed(b"data:\n\n"), vec![String::new()]);
    }
}
