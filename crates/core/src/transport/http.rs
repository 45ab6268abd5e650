//! HTTP implementation of the `Backend` trait.
//!
//! Request/response calls are JSON over HTTP with a per-request timeout. The
//! scene stream is a long-lived `text/event-stream` response read chunk by
//! chunk; it is never timed out by the client.

use crate::config::ClientConfig;
use crate::transport::base::{Backend, SceneEventStream, SourceFile};
use crate::transport::error::{StreamError, TransportError, TransportResult};
use crate::transport::sse::decode_event_stream;
use async_trait::async_trait;
use reqwest::{multipart, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use sk_protocol::{
    Ack, AnalyzeResponse, BeatSheet, BeatSheetRequest, BeatSheetResponse, CharacterResponse,
    ContextStatus, CreateProjectRequest, CreateProjectResponse, ExportFormat, ExportOutput,
    HealthStatus, MarkdownExport, Methodology, MethodologyDetail, MethodologyListResponse,
    OptimizationResponse, ProjectDetail, ProjectListResponse, ProjectSummary, ReviseSceneRequest,
    SceneOutlinesResponse, SceneResponse, SelectConceptRequest, UploadResponse,
    WriteSceneResponse,
};
use std::time::Duration;

/// Backend reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Create a transport for the configured backend.
    pub fn new(config: ClientConfig) -> TransportResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.config.api_url(path))
            .timeout(self.config.request_timeout())
    }

    fn scenario_path(project_id: &str, rest: &str) -> String {
        format!("/projects/{project_id}/senaryo{rest}")
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> TransportResult<T> {
        let response = send(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

async fn send(request: RequestBuilder) -> TransportResult<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| TransportError::Network(e.to_string()))?;
    check_status(response).await
}

async fn check_status(response: Response) -> TransportResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let err = TransportError::from_status(status.as_u16(), &body);
    tracing::debug!(status = status.as_u16(), error = %err, "backend returned error status");
    Err(err)
}

#[async_trait]
impl Backend for HttpTransport {
    async fn create_project(
        &self,
        request: &CreateProjectRequest,
    ) -> TransportResult<CreateProjectResponse> {
        self.send_json(self.request(Method::POST, "/projects").json(request))
            .await
    }

    async fn list_projects(&self) -> TransportResult<Vec<ProjectSummary>> {
        let list: ProjectListResponse = self
            .send_json(self.request(Method::GET, "/projects"))
            .await?;
        Ok(list.projects)
    }

    async fn get_project(&self, project_id: &str) -> TransportResult<ProjectDetail> {
        self.send_json(self.request(Method::GET, &format!("/projects/{project_id}")))
            .await
    }

    async fn delete_project(&self, project_id: &str) -> TransportResult<Ack> {
        self.send_json(self.request(Method::DELETE, &format!("/projects/{project_id}")))
            .await
    }

    async fn upload_source(
        &self,
        project_id: &str,
        source: SourceFile,
    ) -> TransportResult<UploadResponse> {
        let part = multipart::Part::bytes(source.bytes)
            .file_name(source.file_name)
            .mime_str(&source.mime_type)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        self.send_json(
            self.request(Method::POST, &format!("/projects/{project_id}/source"))
                .multipart(form),
        )
        .await
    }

    async fn list_methodologies(&self) -> TransportResult<Vec<Methodology>> {
        let list: MethodologyListResponse = self
            .send_json(self.request(Method::GET, "/methodologies"))
            .await?;
        Ok(list.methodologies)
    }

    async fn get_methodology(&self, methodology_id: &str) -> TransportResult<MethodologyDetail> {
        self.send_json(self.request(Method::GET, &format!("/methodologies/{methodology_id}")))
            .await
    }

    async fn analyze(&self, project_id: &str) -> TransportResult<AnalyzeResponse> {
        let path = Self::scenario_path(project_id, "/analyze");
        self.send_json(self.request(Method::POST, &path)).await
    }

    async fn select_concept(
        &self,
        project_id: &str,
        request: &SelectConceptRequest,
    ) -> TransportResult<CharacterResponse> {
        let path = Self::scenario_path(project_id, "/select-concept");
        self.send_json(self.request(Method::POST, &path).json(request))
            .await
    }

    async fn create_beat_sheet(
        &self,
        project_id: &str,
        methodology: &str,
    ) -> TransportResult<BeatSheetResponse> {
        let path = Self::scenario_path(project_id, "/beat-sheet");
        let body = BeatSheetRequest {
            methodology: methodology.to_string(),
        };
        self.send_json(self.request(Method::POST, &path).json(&body))
            .await
    }

    async fn update_beat_sheet(
        &self,
        project_id: &str,
        beat_sheet: &BeatSheet,
    ) -> TransportResult<Ack> {
        let path = Self::scenario_path(project_id, "/beat-sheet");
        self.send_json(self.request(Method::PUT, &path).json(beat_sheet))
            .await
    }

    async fn create_scene_outlines(
        &self,
        project_id: &str,
    ) -> TransportResult<SceneOutlinesResponse> {
        let path = Self::scenario_path(project_id, "/scene-outline");
        self.send_json(self.request(Method::POST, &path)).await
    }

    async fn write_next_scene(&self, project_id: &str) -> TransportResult<WriteSceneResponse> {
        let path = Self::scenario_path(project_id, "/scenes/next");
        self.send_json(self.request(Method::POST, &path)).await
    }

    async fn stream_next_scene(&self, project_id: &str) -> Result<SceneEventStream, StreamError> {
        let url = self
            .config
            .api_url(&Self::scenario_path(project_id, "/scenes/next/stream"));
        tracing::debug!(%url, "opening scene stream");

        // No per-request timeout: the stream stays open for the whole generation.
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| StreamError::connection(e.to_string()))?;

        let response = check_status(response)
            .await
            .map_err(|e| StreamError::connection(e.to_string()))?;

        Ok(decode_event_stream(response.bytes_stream()))
    }

    async fn revise_scene(
        &self,
        project_id: &str,
        request: &ReviseSceneRequest,
    ) -> TransportResult<SceneResponse> {
        let path = Self::scenario_path(project_id, &format!("/scenes/{}", request.scene_number));
        self.send_json(self.request(Method::PUT, &path).json(request))
            .await
    }

    async fn expand_scene(
        &self,
        project_id: &str,
        scene_number: u32,
    ) -> TransportResult<SceneResponse> {
        let path = Self::scenario_path(project_id, &format!("/scenes/{scene_number}/expand"));
        self.send_json(self.request(Method::POST, &path)).await
    }

    async fn approve_scene(&self, project_id: &str, scene_number: u32) -> TransportResult<Ack> {
        let path = Self::scenario_path(project_id, &format!("/scenes/{scene_number}/approve"));
        self.send_json(self.request(Method::POST, &path)).await
    }

    async fn optimize(&self, project_id: &str) -> TransportResult<OptimizationResponse> {
        let path = Self::scenario_path(project_id, "/optimize");
        self.send_json(self.request(Method::POST, &path)).await
    }

    async fn export(
        &self,
        project_id: &str,
        format: ExportFormat,
    ) -> TransportResult<ExportOutput> {
        let path = Self::scenario_path(project_id, "/export");
        let request = self
            .request(Method::GET, &path)
            .query(&[("format", format.as_str())]);

        match format {
            ExportFormat::Json => Ok(ExportOutput::Json(self.send_json(request).await?)),
            ExportFormat::Markdown => {
                let body: MarkdownExport = self.send_json(request).await?;
                Ok(ExportOutput::Markdown(body.markdown))
            }
        }
    }

    async fn project_status(&self, project_id: &str) -> TransportResult<serde_json::Value> {
        self.send_json(self.request(Method::GET, &format!("/projects/{project_id}/status")))
            .await
    }

    async fn context_status(&self, project_id: &str) -> TransportResult<ContextStatus> {
        self.send_json(self.request(Method::GET, &format!("/projects/{project_id}/context")))
            .await
    }

    async fn health(&self) -> TransportResult<HealthStatus> {
        let request = self
            .client
            .get(self.config.root_url("/health"))
            .timeout(self.config.request_timeout());
        self.send_json(request).await
    }
}
