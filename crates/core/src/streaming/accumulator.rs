//! Incremental assembly of a streamed scene.
//!
//! The accumulator is a pure state machine: it sees payloads in emission
//! order and decides whether each one is text, the completion sentinel or an
//! in-band failure. It never touches the network.

use crate::transport::StreamError;
use uuid::Uuid;

/// Payload marking successful completion of a scene stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Prefix of a payload reporting a generation failure.
pub const ERROR_PREFIX: &str = "[ERROR]";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamPhase {
    #[default]
    Idle,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

/// What a single payload did to the accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    /// Text appended.
    Appended,
    Completed,
    Failed(StreamError),
    /// No stream is active; the payload was dropped.
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneAccumulator {
    phase: StreamPhase,
    stream_id: Option<Uuid>,
    text: String,
}

impl SceneAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new stream, discarding any text from the previous one.
    pub fn start(&mut self, stream_id: Uuid) {
        self.phase = StreamPhase::Streaming;
        self.stream_id = Some(stream_id);
        self.text.clear();
    }

    pub fn feed(&mut self, payload: &str) -> Feed {
        if self.phase != StreamPhase::Streaming {
            return Feed::Ignored;
        }

        if payload == DONE_SENTINEL {
            self.phase = StreamPhase::Completed;
            return Feed::Completed;
        }

        if let Some(detail) = payload.strip_prefix(ERROR_PREFIX) {
            let detail = detail.trim();
            let message = if detail.is_empty() {
                "Scene generation failed".to_string()
            } else {
                detail.to_string()
            };
            let error = StreamError::Server(message);
            self.phase = StreamPhase::Failed;
            return Feed::Failed(error);
        }

        self.text.push_str(payload);
        Feed::Appended
    }

    /// Mark the stream failed without an in-band error payload.
    pub fn fail(&mut self) {
        if self.phase == StreamPhase::Streaming {
            self.phase = StreamPhase::Failed;
        }
    }

    /// Mark the stream cancelled. The partial text is kept for display.
    pub fn cancel(&mut self) {
        if self.phase == StreamPhase::Streaming {
            self.phase = StreamPhase::Cancelled;
        }
    }

    /// Back to idle with no text.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn stream_id(&self) -> Option<Uuid> {
        self.stream_id
    }

    /// Whether `stream_id` is the stream this accumulator is collecting.
    pub fn is_current(&self, stream_id: Uuid) -> bool {
        self.stream_id == Some(stream_id)
    }

    pub fn is_streaming(&self) -> bool {
        self.phase == StreamPhase::Streaming
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
