//! Handles for a running scene stream.

use crate::transport::StreamError;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// How a scene stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The completion sentinel arrived. Carries the accumulated text.
    Completed(String),
    Failed(StreamError),
    Cancelled,
}

/// Cloneable trigger that closes a scene stream.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub(crate) fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Resolves once `rx` observes a cancellation. Never resolves if every
/// `CancelHandle` is dropped without cancelling.
pub(crate) async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// A scene stream running in the background.
///
/// Chunks are published as `Event::StreamChunk` and collected into the
/// workflow state; this handle only identifies, cancels and awaits it.
#[derive(Debug)]
pub struct SceneStreamSubscription {
    id: Uuid,
    cancel: CancelHandle,
    task: JoinHandle<StreamOutcome>,
}

impl SceneStreamSubscription {
    pub(crate) fn new(id: Uuid, cancel: CancelHandle, task: JoinHandle<StreamOutcome>) -> Self {
        Self { id, cancel, task }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Close the connection. Chunks already received are kept.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Wait for the stream to end.
    pub async fn finished(self) -> StreamOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => StreamOutcome::Failed(StreamError::connection(e.to_string())),
        }
    }
}
