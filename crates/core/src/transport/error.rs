//! Error types for the transport adapter.

use sk_protocol::ErrorBody;
use thiserror::Error;

/// Failure of a request/response call against the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The backend answered with a non-success status.
    ///
    /// `detail` is the backend's own message when it sent one, otherwise
    /// `HTTP <status>`.
    #[error("{detail}")]
    Http { status: u16, detail: String },

    /// The request never got a response (connection refused, timeout, ...).
    #[error("Network error: {0}")]
    Network(String),

    /// The response body did not have the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The request could not be built (unreadable source file, ...).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Build an error from a non-success status and its raw body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message())
            .unwrap_or_else(|| format!("HTTP {status}"));
        TransportError::Http { status, detail }
    }

    /// HTTP status of the failure, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure of the scene event stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The backend reported a generation failure in-band.
    #[error("{0}")]
    Server(String),

    /// The connection could not be opened or broke mid-stream.
    ///
    /// The reason is kept for logs; users only see a generic message.
    #[error("Streaming error")]
    Connection { reason: String },

    /// The connection closed without the completion sentinel.
    #[error("Streaming error: stream ended before completion")]
    Ended,
}

impl StreamError {
    pub fn connection(reason: impl Into<String>) -> Self {
        StreamError::Connection {
            reason: reason.into(),
        }
    }
}

/// Type alias for Result with TransportError.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_prefers_detail() {
        let err = TransportError::from_status(404, r#"{"detail": "Sahne bulunamadi"}"#);
        assert_eq!(err.to_string(), "Sahne bulunamadi");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_from_status_falls_back_to_status_code() {
        let err = TransportError::from_status(502, "<html>Bad Gateway</html>");
        assert_eq!(err.to_string(), "HTTP 502");

        let err = TransportError::from_status(500, r#"{"detail": ""}"#);
        assert_eq!(err.to_string(), "HTTP 500");
    }

    #[test]
    fn test_connection_error_hides_reason() {
        let err = StreamError::connection("tcp reset by peer");
        assert_eq!(err.to_string(), "Streaming error");
        assert!(format!("{err:?}").contains("tcp reset"));
    }
}
