//! Communication protocol between the core and its consumers.
//!
//! This module defines the message types exchanged between UI-level
//! collaborators (a CLI, a TUI, a web bridge) and the workflow core.
//!
//! The protocol follows an Operation/Event pattern:
//! - `Op`: Commands sent from a consumer to the core
//! - `Event`: State changes published by the core
//!
//! Consumers never mutate workflow state themselves; they render whatever the
//! events (or a state snapshot) tell them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::api_models::ExportFormat;
use crate::project_models::ProjectSummary;
use crate::screenplay_models::BeatSheet;
use crate::workflow_models::{ContextStatus, WorkflowStep};

/// Operations sent from a consumer to the core.
///
/// Uses tagged enum serialization for TypeScript compatibility:
/// ```json
/// {
///   "type": "reviseScene",
///   "payload": {
///     "scene_number": 3,
///     "notes": "Make the argument louder"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Op {
    /// Refresh the project list.
    LoadProjects,

    /// Create a project and refresh the list.
    CreateProject {
        name: String,
        target_duration_minutes: u32,
        methodology: String,
        language: String,
    },

    /// Make a project current, loading its artifact bundle.
    SelectProject { project_id: String },

    /// Delete a project.
    DeleteProject { project_id: String },

    /// Attach source material to the current project.
    UploadSource { file_name: String, content: Vec<u8> },

    /// Run source analysis for the current project.
    AnalyzeSource,

    /// Pick one of the proposed concepts.
    SelectConcept { index: usize },

    /// Generate a beat sheet with the given methodology.
    CreateBeatSheet { methodology: String },

    /// Replace the beat sheet with an edited one.
    UpdateBeatSheet { beat_sheet: BeatSheet },

    /// Generate scene outlines from the beat sheet.
    CreateSceneOutlines,

    /// Write the next unwritten scene (request/response).
    WriteNextScene,

    /// Write the next unwritten scene over the event stream.
    StreamNextScene,

    /// Cancel the in-flight scene stream, if any.
    CancelStream,

    ApproveScene { scene_number: u32 },

    ExpandScene { scene_number: u32 },

    ReviseScene { scene_number: u32, notes: String },

    RunOptimization,

    Export { format: ExportFormat },

    RefreshContextStatus,

    /// Leave the current project.
    NavigateHome,

    /// Clear the shared error message.
    DismissError,
}

/// Events published by the core.
///
/// Uses tagged enum serialization for TypeScript compatibility:
/// ```json
/// {
///   "type": "stepChanged",
///   "payload": {
///     "step": "writing"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// The current pipeline stage changed.
    StepChanged { step: WorkflowStep },

    /// At least one operation is in flight (`true`) or none is (`false`).
    BusyChanged { busy: bool },

    /// The shared error message was set, replacing any previous one.
    ErrorRaised { message: String },

    /// The shared error message was cleared.
    ErrorCleared,

    /// The project list was replaced.
    ProjectsLoaded { projects: Vec<ProjectSummary> },

    /// A project became current (or was reloaded).
    ProjectSelected { project_id: String },

    /// The current project was cleared.
    ProjectCleared,

    /// The scene collection was replaced.
    ScenesUpdated { count: usize },

    /// A scene stream was opened.
    StreamStarted {
        #[ts(type = "string")]
        stream_id: Uuid,
    },

    /// A chunk of generated text arrived on the stream.
    StreamChunk {
        #[ts(type = "string")]
        stream_id: Uuid,
        chunk: String,
    },

    /// The stream delivered its completion sentinel.
    StreamCompleted {
        #[ts(type = "string")]
        stream_id: Uuid,
    },

    /// The stream failed, either server-reported or at the connection level.
    StreamFailed {
        #[ts(type = "string")]
        stream_id: Uuid,
        error: String,
    },

    /// The stream was cancelled by the consumer.
    StreamCancelled {
        #[ts(type = "string")]
        stream_id: Uuid,
    },

    /// Fresh context-window usage.
    ContextStatusUpdated { status: ContextStatus },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_tagged_serialization() {
        let op = Op::ReviseScene {
            scene_number: 3,
            notes: "louder".to_string(),
        };
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["type"], "reviseScene");
        assert_eq!(value["payload"]["scene_number"], 3);

        let unit: Op = serde_json::from_str(r#"{"type": "analyzeSource"}"#).unwrap();
        assert!(matches!(unit, Op::AnalyzeSource));
    }

    #[test]
    fn test_event_round_trip_keeps_step() {
        let event = Event::StepChanged {
            step: WorkflowStep::SceneOutline,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"stepChanged\""));
        assert!(json.contains("\"scene_outline\""));
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
