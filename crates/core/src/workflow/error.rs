//! Error types for workflow operations.

use crate::reconcile::ReconcileError;
use crate::transport::{StreamError, TransportError};
use thiserror::Error;

/// Precondition failures, raised before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No project is selected")]
    NoActiveProject,

    #[error("Project name must not be empty")]
    EmptyProjectName,

    #[error("Revision notes must not be empty")]
    EmptyRevisionNotes,

    #[error("Concept {index} does not exist ({available} concepts available)")]
    ConceptOutOfRange { index: usize, available: usize },

    #[error("Scene {0} has not been written")]
    UnknownScene(u32),

    #[error("A scene is already being streamed")]
    StreamAlreadyActive,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Type alias for Result with WorkflowError.
pub type WorkflowResult<T> = Result<T, WorkflowError>;
