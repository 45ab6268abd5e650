//! Server-sent event decoding.
//!
//! Only the parts of the event-stream format the backend uses are honoured:
//! `data:` fields (multi-line data joined with `\n`), comments, and blank-line
//! dispatch. Other fields (`event`, `id`, `retry`) are ignored.

use crate::transport::base::SceneEventStream;
use crate::transport::error::StreamError;
use std::borrow::Cow;
use tokio_stream::{Stream, StreamExt};

/// Incremental decoder turning raw bytes into event payloads.
///
/// Bytes are buffered until a full line is available, so multi-byte UTF-8
/// sequences split across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: String,
    has_data: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every event completed by it.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Cow::Owned(replaced) = &line {
                tracing::warn!(line = %replaced, "invalid UTF-8 in event stream replaced");
            }
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        events
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if !self.has_data {
                return None;
            }
            self.has_data = false;
            return Some(std::mem::take(&mut self.data));
        }

        // Comment line
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        if field == "data" {
            if self.has_data {
                self.data.push('\n');
            }
            self.data.push_str(value);
            self.has_data = true;
        }

        None
    }
}

/// Decode a byte stream into a stream of event payloads.
///
/// Transport errors end the stream with `StreamError::Connection`. An event
/// left incomplete when the bytes run out is discarded.
pub fn decode_event_stream<S, B, E>(bytes: S) -> SceneEventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut decoder = SseDecoder::new();
        let mut bytes = Box::pin(bytes);

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    for event in decoder.push(chunk.as_ref()) {
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    yield Err(StreamError::connection(e.to_string()));
                    return;
                }
            }
        }
    };

    Box::pin(stream)
}
