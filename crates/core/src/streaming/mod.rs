//! Incremental scene streaming.
//!
//! The accumulator interprets payloads; the subscription types let callers
//! cancel and await a stream that the workflow manager drives in the
//! background.

pub mod accumulator;
pub mod subscription;

pub use accumulator::{Feed, SceneAccumulator, StreamPhase, DONE_SENTINEL, ERROR_PREFIX};
pub use subscription::{CancelHandle, SceneStreamSubscription, StreamOutcome};
