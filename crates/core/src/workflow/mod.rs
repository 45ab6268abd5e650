//! Workflow orchestration.
//!
//! This module provides:
//! - `WorkflowManager`: runs pipeline operations against a `Backend`
//! - `WorkflowState`: the client-side state and its derived views
//! - Stage derivation for resumed projects
//! - Validation and workflow error types

pub mod error;
pub mod manager;
pub mod stage;
pub mod state;

pub use error::{ValidationError, WorkflowError, WorkflowResult};
pub use manager::{OpOutput, WorkflowManager, WriteOutcome};
pub use stage::{resume_step, ResumeSignals};
pub use state::{Artifacts, WorkflowState};
