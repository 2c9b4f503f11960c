/// SSE (Server-Sent Events) frame parser and the agent chunk stream built on it.
///
/// Handles buffering partial lines and field semantics per the
/// [SSE specification](https://html.spec.whatwg.org/multipage/server-sent-events.html).
use std::fmt::Display;

use futures_util::{future, Stream, StreamExt};
use memchr::memchr_iter;

use super::SseEvent;
use crate::protocol::chunk::{validate, ChunkParseError, ParseResult};

// ---------------------------------------------------------------------------
// SseParser: incremental SSE line parser
// ---------------------------------------------------------------------------

/// Incremental SSE line parser.
///
/// Feed it raw text chunks (potentially arriving in arbitrary byte
/// boundaries) and it yields fully-assembled [`SseEvent`] frames.
pub struct SseParser {
    buffer: String,
    read_offset: usize,
    event_type: Option<String>,
    data_buffer: String,
    has_data: bool,
    last_event_id: Option<String>,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            read_offset: 0,
            event_type: None,
            data_buffer: String::new(),
            has_data: false,
            last_event_id: None,
        }
    }

    /// Feed raw text and return any complete events parsed.
    ///
    /// - `event:` sets the event type for the next frame
    /// - `data:` appends to the data buffer, multiple lines joined with `\n`
    /// - an empty line terminates a frame
    /// - `:` starts a comment
    /// - `id:` sets the last event ID; `retry:` is accepted and ignored
    pub fn feed(&mut self, chunk: &str) -> Vec<SseEvent> {
        let mut out = Vec::new();
        self.feed_into(chunk, &mut out);
        out
    }

    /// Feed raw text and append complete events into a caller-provided buffer.
    pub fn feed_into(&mut self, chunk: &str, out: &mut Vec<SseEvent>) {
        self.buffer.push_str(chunk);
        let mut processed_up_to = self.read_offset;
        let bytes = self.buffer.as_bytes();
        let scan_start = processed_up_to;
        for rel_pos in memchr_iter(b'\n', &bytes[scan_start..]) {
            let line_end = scan_start + rel_pos;
            let mut line = &self.buffer[processed_up_to..line_end];
            if let Some(stripped) = line.strip_suffix('\r') {
                line = stripped;
            }
            Self::process_line(
                line,
                &mut self.event_type,
                &mut self.data_buffer,
                &mut self.has_data,
                &mut self.last_event_id,
                out,
            );
            processed_up_to = line_end + 1;
        }

        self.read_offset = processed_up_to;
        if self.read_offset == self.buffer.len() {
            self.buffer.clear();
            self.read_offset = 0;
            return;
        }
        let should_compact = self.read_offset > 0
            && (self.read_offset >= self.buffer.len() / 2 || self.read_offset >= 8 * 1024);
        if should_compact {
            self.buffer.drain(..self.read_offset);
            self.read_offset = 0;
        }
    }

    fn process_line(
        line: &str,
        event_type: &mut Option<String>,
        data_buffer: &mut String,
        has_data: &mut bool,
        last_event_id: &mut Option<String>,
        events: &mut Vec<SseEvent>,
    ) {
        if line.is_empty() {
            if *has_data {
                events.push(SseEvent {
                    event: event_type.take(),
                    data: std::mem::take(data_buffer),
                    id: last_event_id.clone(),
                });
                *has_data = false;
            }
            return;
        }

        if line.starts_with(':') {
            return;
        }

        if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            if *has_data {
                data_buffer.push('\n');
            } else {
                *has_data = true;
            }
            data_buffer.push_str(value);
        } else if let Some(value) = line.strip_prefix("event:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            *event_type = Some(value.to_string());
        } else if let Some(value) = line.strip_prefix("id:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            *last_event_id = Some(value.to_string());
        }
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if an [`SseEvent`] is a terminal `[DONE]` marker.
#[must_use]
pub fn is_done_event(event: &SseEvent) -> bool {
    event.data.trim() == "[DONE]"
}

// ---------------------------------------------------------------------------
// Stream utilities
// ---------------------------------------------------------------------------

/// Feed the decodable part of `remainder` into the parser.
///
/// Invalid byte sequences become U+FFFD; an incomplete trailing sequence is
/// kept for the next chunk.
fn feed_utf8_prefix(parser: &mut SseParser, remainder: &mut Vec<u8>, out: &mut Vec<SseEvent>) {
    if let Ok(text) = std::str::from_utf8(remainder) {
        parser.feed_into(text, out);
        remainder.clear();
        return;
    }

    let mut decoded = String::with_capacity(remainder.len());
    let mut consumed = 0;
    while consumed < remainder.len() {
        match std::str::from_utf8(&remainder[consumed..]) {
            Ok(text) => {
                decoded.push_str(text);
                consumed = remainder.len();
            }
            Err(err) => {
                let valid_end = consumed + err.valid_up_to();
                if let Ok(text) = std::str::from_utf8(&remainder[consumed..valid_end]) {
                    decoded.push_str(text);
                }
                match err.error_len() {
                    Some(invalid_len) => {
                        decoded.push(char::REPLACEMENT_CHARACTER);
                        consumed = valid_end + invalid_len;
                    }
                    None => {
                        consumed = valid_end;
                        break;
                    }
                }
            }
        }
    }

    parser.feed_into(&decoded, out);
    remainder.drain(..consumed);
}

/// Split a byte stream into SSE events using [`SseParser`].
///
/// A read error is yielded once as `Err(message)` and ends the stream.
pub fn sse_frame_stream<S, E>(byte_stream: S) -> impl Stream<Item = Result<SseEvent, String>> + Send
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    futures_util::stream::unfold(
        (
            Box::pin(byte_stream),
            SseParser::new(),
            Vec::<u8>::new(),
            std::collections::VecDeque::<SseEvent>::new(),
            false,
        ),
        |(mut stream, mut parser, mut remainder, mut pending, failed)| async move {
            if failed {
                return None;
            }
            loop {
                if let Some(event) = pending.pop_front() {
                    return Some((Ok(event), (stream, parser, remainder, pending, false)));
                }

                match stream.as_mut().next().await? {
                    Ok(bytes) => {
                        remainder.extend_from_slice(&bytes);
                        let mut parsed = Vec::new();
                        feed_utf8_prefix(&mut parser, &mut remainder, &mut parsed);
                        pending.extend(parsed);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "agent stream read failed");
                        return Some((Err(err.to_string()), (stream, parser, remainder, pending, true)));
                    }
                }
            }
        },
    )
}

/// Turn a gateway response body into validated chunks, one per SSE event.
///
/// `[DONE]` markers are skipped. A read error becomes a final
/// [`ChunkParseError`] item.
pub fn agent_chunk_stream<S, E>(byte_stream: S) -> impl Stream<Item = ParseResult> + Send
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    sse_frame_stream(byte_stream).filter_map(|frame| {
        future::ready(match frame {
            Ok(event) if is_done_event(&event) => None,
            Ok(event) => Some(validate(&event.data)),
            Err(message) => Some(Err(ChunkParseError::new(
                format!("stream read failed: {message}"),
                String::new(),
            ))),
        })
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
