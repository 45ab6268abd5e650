//! Base `Backend` trait and supporting types.
//!
//! The trait is the seam between the workflow core and the generation
//! service: the HTTP adapter implements it for real use, the scripted mock
//! implements it for tests.

use crate::transport::error::{StreamError, TransportError, TransportResult};
use async_trait::async_trait;
use sk_protocol::{
    Ack, AnalyzeResponse, BeatSheet, BeatSheetResponse, CharacterResponse, ContextStatus,
    CreateProjectRequest, CreateProjectResponse, ExportFormat, ExportOutput, HealthStatus,
    Methodology, MethodologyDetail, OptimizationResponse, ProjectDetail, ProjectSummary,
    ReviseSceneRequest, SceneOutlinesResponse, SceneResponse, SelectConceptRequest,
    UploadResponse, WriteSceneResponse,
};
use std::path::Path;
use std::pin::Pin;
use tokio_stream::Stream;

/// Raw payloads of the scene event stream, in emission order.
///
/// Each item is the `data` of one server-sent event. Interpreting the
/// completion sentinel and error prefix is the accumulator's job.
pub type SceneEventStream = Pin<Box<dyn Stream<Item = Result<String, StreamError>> + Send>>;

/// Source material to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    /// Create a source file from in-memory content.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_for(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    /// Read a source file from disk.
    ///
    /// The 50MB guidance limit is not enforced here; the backend decides.
    pub async fn from_path(path: &Path) -> TransportResult<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            TransportError::InvalidRequest(format!("cannot read {}: {e}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("source.txt")
            .to_string();
        Ok(Self::new(file_name, bytes))
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "md" => "text/markdown",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// The generation backend's contract, as consumed by the core.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn create_project(
        &self,
        request: &CreateProjectRequest,
    ) -> TransportResult<CreateProjectResponse>;
    async fn list_projects(&self) -> TransportResult<Vec<ProjectSummary>>;
    async fn get_project(&self, project_id: &str) -> TransportResult<ProjectDetail>;
    async fn delete_project(&self, project_id: &str) -> TransportResult<Ack>;

    async fn upload_source(
        &self,
        project_id: &str,
        source: SourceFile,
    ) -> TransportResult<UploadResponse>;

    async fn list_methodologies(&self) -> TransportResult<Vec<Methodology>>;
    async fn get_methodology(&self, methodology_id: &str) -> TransportResult<MethodologyDetail>;

    async fn analyze(&self, project_id: &str) -> TransportResult<AnalyzeResponse>;
    async fn select_concept(
        &self,
        project_id: &str,
        request: &SelectConceptRequest,
    ) -> TransportResult<CharacterResponse>;
    async fn create_beat_sheet(
        &self,
        project_id: &str,
        methodology: &str,
    ) -> TransportResult<BeatSheetResponse>;
    async fn update_beat_sheet(
        &self,
        project_id: &str,
        beat_sheet: &BeatSheet,
    ) -> TransportResult<Ack>;
    async fn create_scene_outlines(&self, project_id: &str)
        -> TransportResult<SceneOutlinesResponse>;

    async fn write_next_scene(&self, project_id: &str) -> TransportResult<WriteSceneResponse>;

    /// Open the persistent event connection for writing the next scene.
    ///
    /// Dropping the returned stream closes the connection.
    async fn stream_next_scene(&self, project_id: &str) -> Result<SceneEventStream, StreamError>;

    async fn revise_scene(
        &self,
        project_id: &str,
        request: &ReviseSceneRequest,
    ) -> TransportResult<SceneResponse>;
    async fn expand_scene(&self, project_id: &str, scene_number: u32)
        -> TransportResult<SceneResponse>;
    async fn approve_scene(&self, project_id: &str, scene_number: u32) -> TransportResult<Ack>;

    async fn optimize(&self, project_id: &str) -> TransportResult<OptimizationResponse>;
    async fn export(&self, project_id: &str, format: ExportFormat)
        -> TransportResult<ExportOutput>;

    async fn project_status(&self, project_id: &str) -> TransportResult<serde_json::Value>;
    async fn context_status(&self, project_id: &str) -> TransportResult<ContextStatus>;
    async fn health(&self) -> TransportResult<HealthStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_mime_detection() {
        assert_eq!(SourceFile::new("a.PDF", vec![]).mime_type, "application/pdf");
        assert_eq!(SourceFile::new("notes.md", vec![]).mime_type, "text/markdown");
        assert_eq!(SourceFile::new("book.txt", vec![]).mime_type, "text/plain");
        assert_eq!(
            SourceFile::new("noext", vec![]).mime_type,
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_from_path_reads_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".txt")
            .tempfile()
            .unwrap();
        write!(file, "Bir varmis bir yokmus").unwrap();

        let source = SourceFile::from_path(file.path()).await.unwrap();
        assert_eq!(source.bytes, b"Bir varmis bir yokmus");
        assert_eq!(source.mime_type, "text/plain");
        assert!(source.file_name.ends_with(".txt"));
    }

    #[tokio::test]
    async fn test_from_path_missing_file() {
        let result = SourceFile::from_path(Path::new("/definitely/not/here.pdf")).await;
        assert!(matches!(result, Err(TransportError::InvalidRequest(_))));
    }
}
