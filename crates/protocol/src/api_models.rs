//! Request and response bodies of the generation backend.
//!
//! All paths are relative to the API prefix (`/api/v1` by default). Only the
//! fields the core relies on are required; everything else is defaulted so
//! that additive backend changes do not break decoding.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::project_models::{Project, ProjectSummary};
use crate::screenplay_models::{
    BeatSheet, CharacterCard, FilmConcept, OptimizationReport, Scene, SceneOutline, Screenplay,
};
use crate::workflow_models::ContextStatus;

/// `POST /projects`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct CreateProjectRequest {
    pub name: String,
    pub target_duration_minutes: u32,
    pub methodology: String,
    pub language: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct CreateProjectResponse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub message: String,
}

/// `GET /projects`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectSummary>,
}

/// `GET /projects/{id}`: the project, its full artifact bundle and context usage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ProjectDetail {
    pub project: Project,
    #[serde(default)]
    pub screenplay: Option<Screenplay>,
    #[serde(default)]
    pub context_status: Option<ContextStatus>,
}

/// Generic acknowledgement used by delete and approve.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// `POST /projects/{id}/source`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct UploadResponse {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_uri: String,
    #[serde(default)]
    pub message: String,
}

/// Summary entry of `GET /methodologies`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct Methodology {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub best_for: Vec<String>,
    #[serde(default)]
    pub step_count: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct MethodologyListResponse {
    pub methodologies: Vec<Methodology>,
}

/// One step of a methodology, as listed by `GET /methodologies/{id}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct MethodologyStep {
    pub number: u32,
    pub name: String,
    #[serde(default)]
    pub english_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub percentage_of_story: f64,
    #[serde(default)]
    pub act: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct MethodologyDetail {
    #[serde(flatten)]
    pub methodology: Methodology,
    #[serde(default)]
    pub steps: Vec<MethodologyStep>,
}

/// `POST /projects/{id}/senaryo/analyze`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct AnalyzeResponse {
    pub concepts: Vec<FilmConcept>,
    #[serde(default)]
    pub source_summary: String,
}

/// `POST /projects/{id}/senaryo/select-concept`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct SelectConceptRequest {
    pub concept_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct CharacterResponse {
    pub protagonist: CharacterCard,
    #[serde(default)]
    pub suggested_supporting: Vec<String>,
}

/// `POST /projects/{id}/senaryo/beat-sheet`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct BeatSheetRequest {
    pub methodology: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct BeatSheetResponse {
    pub beat_sheet: BeatSheet,
}

/// `POST /projects/{id}/senaryo/scene-outline`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct SceneOutlinesResponse {
    pub outlines: Vec<SceneOutline>,
    #[serde(default)]
    pub total_duration_seconds: u32,
}

/// `POST /projects/{id}/senaryo/scenes/next`
///
/// When every outline already has a scene the backend answers with
/// `all_scenes_completed: true` and no scene.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct WriteSceneResponse {
    #[serde(default)]
    pub scene: Option<Scene>,
    #[serde(default)]
    pub all_scenes_completed: bool,
    #[serde(default)]
    pub quality_notes: Option<String>,
    #[serde(default)]
    pub user_guidance: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of revise and expand.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct SceneResponse {
    pub scene: Scene,
}

/// `PUT /projects/{id}/senaryo/scenes/{n}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct ReviseSceneRequest {
    pub scene_number: u32,
    pub revision_notes: String,
}

/// `POST /projects/{id}/senaryo/optimize`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct OptimizationResponse {
    pub report: OptimizationReport,
}

/// Output format of `GET /projects/{id}/senaryo/export`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, TS)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Markdown,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "markdown",
        }
    }

    /// Conventional file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "md",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            other => Err(format!("unsupported export format: {other}")),
        }
    }
}

/// Exported screenplay, handed to the presentation layer as-is.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(tag = "format", content = "content", rename_all = "lowercase")]
pub enum ExportOutput {
    Json(serde_json::Value),
    Markdown(String),
}

impl ExportOutput {
    /// Render the export as text suitable for writing to a file.
    pub fn to_text(&self) -> String {
        match self {
            ExportOutput::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            ExportOutput::Markdown(text) => text.clone(),
        }
    }
}

/// Body of the markdown export.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct MarkdownExport {
    pub markdown: String,
}

/// `GET /health`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub api_key_configured: bool,
    #[serde(default)]
    pub projects_count: u32,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Error body returned by the backend on non-success responses.
///
/// `detail` is usually a string, but validation failures carry a list of
/// objects, hence the untyped value.
#[derive(Deserialize, Debug, Clone)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// The human-readable detail message, when the backend sent one.
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .map(str::to_string)
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("; "))
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_scene_response_all_completed() {
        let json = r#"{"success": false, "message": "Tum sahneler yazildi", "all_scenes_completed": true}"#;
        let response: WriteSceneResponse = serde_json::from_str(json).unwrap();
        assert!(response.all_scenes_completed);
        assert!(response.scene.is_none());
    }

    #[test]
    fn test_revise_request_wire_shape() {
        let request = ReviseSceneRequest {
            scene_number: 4,
            revision_notes: "Daha gergin".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"scene_number": 4, "revision_notes": "Daha gergin"})
        );
    }

    #[test]
    fn test_select_concept_request_omits_missing_duration() {
        let request = SelectConceptRequest {
            concept_index: 1,
            duration_minutes: None,
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"concept_index":1}"#
        );
    }

    #[test]
    fn test_export_format_parsing() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert!("pdf".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Markdown.extension(), "md");
    }

    #[test]
    fn test_error_body_string_detail() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail": "Proje bulunamadi"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("Proje bulunamadi"));
    }

    #[test]
    fn test_error_body_validation_list() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"detail": [{"loc": ["body", "name"], "msg": "field required"}, {"msg": "too short"}]}"#,
        )
        .unwrap();
        assert_eq!(body.message().as_deref(), Some("field required; too short"));
    }

    #[test]
    fn test_error_body_without_detail() {
        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.message().is_none());
    }

    #[test]
    fn test_methodology_detail_flattens_summary() {
        let json = r#"{
            "id": "save_the_cat",
            "name": "Save the Cat",
            "author": "Blake Snyder",
            "description": "15 beats",
            "best_for": ["commercial"],
            "step_count": 15,
            "steps": [{"number": 1, "name": "Acilis", "english_name": "Opening Image",
                       "description": "d", "percentage_of_story": 1.0, "act": 1}]
        }"#;
        let detail: MethodologyDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.methodology.id, "save_the_cat");
        assert_eq!(detail.steps.len(), 1);
        assert_eq!(detail.steps[0].english_name, "Opening Image");
    }
}
