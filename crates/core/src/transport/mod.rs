//! Transport adapter between the workflow core and the generation backend.
//!
//! This module provides:
//! - The `Backend` trait every backend implementation satisfies
//! - `HttpTransport`, the reqwest-based implementation
//! - `MockBackend`, a scripted implementation for tests
//! - A server-sent event decoder for the scene stream

pub mod base;
pub mod error;
pub mod http;
pub mod mock;
pub mod sse;

pub use base::{Backend, SceneEventStream, SourceFile};
pub use error::{StreamError, TransportError, TransportResult};
pub use http::HttpTransport;
pub use mock::{BackendCall, Endpoint, MockBackend};
