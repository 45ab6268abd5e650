//! Scripted backend for testing.
//!
//! Responses are queued per endpoint and consumed in order. Project CRUD
//! falls back to a small in-memory store when nothing is scripted, so most
//! tests only need to script the endpoints they care about. Every call is
//! recorded for later assertions.

use crate::transport::base::{Backend, SceneEventStream, SourceFile};
use crate::transport::error::{StreamError, TransportError, TransportResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sk_protocol::{
    Ack, AnalyzeResponse, BeatSheet, BeatSheetResponse, CharacterResponse, ContextStatus,
    CreateProjectRequest, CreateProjectResponse, ExportFormat, ExportOutput, HealthStatus,
    Methodology, MethodologyDetail, OptimizationResponse, Project, ProjectDetail,
    ProjectSummary, ReviseSceneRequest, SceneOutlinesResponse, SceneResponse,
    SelectConceptRequest, UploadResponse, WriteSceneResponse,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

/// Backend endpoints, as seen by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    CreateProject,
    ListProjects,
    GetProject,
    DeleteProject,
    UploadSource,
    ListMethodologies,
    GetMethodology,
    Analyze,
    SelectConcept,
    CreateBeatSheet,
    UpdateBeatSheet,
    CreateSceneOutlines,
    WriteNextScene,
    StreamNextScene,
    ReviseScene,
    ExpandScene,
    ApproveScene,
    Optimize,
    Export,
    ProjectStatus,
    ContextStatus,
    Health,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendCall {
    pub endpoint: Endpoint,
    pub project_id: Option<String>,
    pub body: Option<serde_json::Value>,
}

struct ScriptedStream {
    opened: Result<Vec<Result<String, StreamError>>, StreamError>,
    hold_open: bool,
}

#[derive(Default)]
struct MockState {
    calls: Vec<BackendCall>,
    scripted: HashMap<Endpoint, VecDeque<TransportResult<serde_json::Value>>>,
    projects: BTreeMap<String, ProjectDetail>,
    streams: VecDeque<ScriptedStream>,
    gates: HashMap<Endpoint, Arc<Notify>>,
    next_id: u32,
}

/// Scripted `Backend` implementation.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
    stream_closed: Arc<AtomicBool>,
}

struct CloseGuard(Arc<AtomicBool>);

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the mock from the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a successful response for an endpoint.
    pub fn respond<T: Serialize>(&self, endpoint: Endpoint, value: &T) {
        let value = serde_json::to_value(value)
            .map_err(|e| TransportError::Decode(e.to_string()));
        self.lock()
            .scripted
            .entry(endpoint)
            .or_default()
            .push_back(value);
    }

    /// Queue a failure for an endpoint.
    pub fn fail(&self, endpoint: Endpoint, error: TransportError) {
        self.lock()
            .scripted
            .entry(endpoint)
            .or_default()
            .push_back(Err(error));
    }

    /// Store a project served by the project endpoints.
    pub fn insert_project(&self, detail: ProjectDetail) {
        self.lock()
            .projects
            .insert(detail.project.id.clone(), detail);
    }

    /// Queue a stream that yields `events` and then ends.
    pub fn push_stream(&self, events: Vec<Result<String, StreamError>>) {
        self.lock().streams.push_back(ScriptedStream {
            opened: Ok(events),
            hold_open: false,
        });
    }

    /// Queue a stream that yields `events` and then stays open until dropped.
    pub fn push_held_stream(&self, events: Vec<Result<String, StreamError>>) {
        self.lock().streams.push_back(ScriptedStream {
            opened: Ok(events),
            hold_open: true,
        });
    }

    /// Queue a stream that cannot be opened.
    pub fn push_stream_failure(&self, error: StreamError) {
        self.lock().streams.push_back(ScriptedStream {
            opened: Err(error),
            hold_open: false,
        });
    }

    /// Hold the next call to `endpoint` until the returned handle is notified.
    pub fn hold(&self, endpoint: Endpoint) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().gates.insert(endpoint, gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }

    /// Whether the last opened stream has been dropped by its consumer.
    pub fn stream_closed(&self) -> bool {
        self.stream_closed.load(Ordering::SeqCst)
    }

    async fn record(
        &self,
        endpoint: Endpoint,
        project_id: Option<&str>,
        body: Option<serde_json::Value>,
    ) {
        let gate = {
            let mut state = self.lock();
            state.calls.push(BackendCall {
                endpoint,
                project_id: project_id.map(str::to_string),
                body,
            });
            state.gates.remove(&endpoint)
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn scripted<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Option<TransportResult<T>> {
        let next = self.lock().scripted.get_mut(&endpoint)?.pop_front()?;
        Some(next.and_then(|value| {
            serde_json::from_value(value).map_err(|e| TransportError::Decode(e.to_string()))
        }))
    }

    fn scripted_or_missing<T: DeserializeOwned>(&self, endpoint: Endpoint) -> TransportResult<T> {
        self.scripted(endpoint).unwrap_or_else(|| {
            Err(TransportError::Http {
                status: 500,
                detail: format!("no scripted response for {endpoint:?}"),
            })
        })
    }
}

fn not_found() -> TransportError {
    TransportError::Http {
        status: 404,
        detail: "Project not found".to_string(),
    }
}

fn body_of<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}

#[async_trait]
impl Backend for MockBackend {
    async fn create_project(
        &self,
        request: &CreateProjectRequest,
    ) -> TransportResult<CreateProjectResponse> {
        self.record(Endpoint::CreateProject, None, body_of(request))
            .await;
        if let Some(scripted) = self.scripted(Endpoint::CreateProject) {
            return scripted;
        }

        let mut state = self.lock();
        state.next_id += 1;
        let id = format!("project-{}", state.next_id);
        let mut project = Project::new(id.clone(), request.name.clone());
        project.config.target_duration_minutes = request.target_duration_minutes;
        project.config.language = request.language.clone();
        state.projects.insert(
            id.clone(),
            ProjectDetail {
                project,
                screenplay: None,
                context_status: None,
            },
        );

        Ok(CreateProjectResponse {
            id,
            name: request.name.clone(),
            message: "created".to_string(),
        })
    }

    async fn list_projects(&self) -> TransportResult<Vec<ProjectSummary>> {
        self.record(Endpoint::ListProjects, None, None).await;
        if let Some(scripted) = self.scripted(Endpoint::ListProjects) {
            return scripted;
        }

        Ok(self
            .lock()
            .projects
            .values()
            .map(|detail| ProjectSummary {
                id: detail.project.id.clone(),
                name: detail.project.name.clone(),
                created_at: detail.project.created_at,
                progress: 0.0,
            })
            .collect())
    }

    async fn get_project(&self, project_id: &str) -> TransportResult<ProjectDetail> {
        self.record(Endpoint::GetProject, Some(project_id), None)
            .await;
        if let Some(scripted) = self.scripted(Endpoint::GetProject) {
            return scripted;
        }

        self.lock()
            .projects
            .get(project_id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn delete_project(&self, project_id: &str) -> TransportResult<Ack> {
        self.record(Endpoint::DeleteProject, Some(project_id), None)
            .await;
        if let Some(scripted) = self.scripted(Endpoint::DeleteProject) {
            return scripted;
        }

        match self.lock().projects.remove(project_id) {
            Some(_) => Ok(Ack {
                success: true,
                message: String::new(),
            }),
            None => Err(not_found()),
        }
    }

    async fn upload_source(
        &self,
        project_id: &str,
        source: SourceFile,
    ) -> TransportResult<UploadResponse> {
        let body = serde_json::json!({
            "file_name": source.file_name,
            "mime_type": source.mime_type,
            "size": source.bytes.len(),
        });
        self.record(Endpoint::UploadSource, Some(project_id), Some(body))
            .await;
        if let Some(scripted) = self.scripted(Endpoint::UploadSource) {
            return scripted;
        }

        let uri = format!("files/{project_id}/{}", source.file_name);
        let mut state = self.lock();
        let detail = state.projects.get_mut(project_id).ok_or_else(not_found)?;
        detail.project.source_file_uri = Some(uri.clone());
        detail.project.source_file_name = Some(source.file_name.clone());

        Ok(UploadResponse {
            file_name: source.file_name,
            file_uri: uri,
            message: "uploaded".to_string(),
        })
    }

    async fn list_methodologies(&self) -> TransportResult<Vec<Methodology>> {
        self.record(Endpoint::ListMethodologies, None, None).await;
        self.scripted_or_missing(Endpoint::ListMethodologies)
    }

    async fn get_methodology(&self, methodology_id: &str) -> TransportResult<MethodologyDetail> {
        let body = serde_json::json!({ "id": methodology_id });
        self.record(Endpoint::GetMethodology, None, Some(body)).await;
        self.scripted_or_missing(Endpoint::GetMethodology)
    }

    async fn analyze(&self, project_id: &str) -> TransportResult<AnalyzeResponse> {
        self.record(Endpoint::Analyze, Some(project_id), None).await;
        self.scripted_or_missing(Endpoint::Analyze)
    }

    async fn select_concept(
        &self,
        project_id: &str,
        request: &SelectConceptRequest,
    ) -> TransportResult<CharacterResponse> {
        self.record(Endpoint::SelectConcept, Some(project_id), body_of(request))
            .await;
        self.scripted_or_missing(Endpoint::SelectConcept)
    }

    async fn create_beat_sheet(
        &self,
        project_id: &str,
        methodology: &str,
    ) -> TransportResult<BeatSheetResponse> {
        let body = serde_json::json!({ "methodology": methodology });
        self.record(Endpoint::CreateBeatSheet, Some(project_id), Some(body))
            .await;
        self.scripted_or_missing(Endpoint::CreateBeatSheet)
    }

    async fn update_beat_sheet(
        &self,
        project_id: &str,
        beat_sheet: &BeatSheet,
    ) -> TransportResult<Ack> {
        self.record(Endpoint::UpdateBeatSheet, Some(project_id), body_of(beat_sheet))
            .await;
        self.scripted(Endpoint::UpdateBeatSheet)
            .unwrap_or_else(|| Ok(Ack::default()))
    }

    async fn create_scene_outlines(
        &self,
        project_id: &str,
    ) -> TransportResult<SceneOutlinesResponse> {
        self.record(Endpoint::CreateSceneOutlines, Some(project_id), None)
            .await;
        self.scripted_or_missing(Endpoint::CreateSceneOutlines)
    }

    async fn write_next_scene(&self, project_id: &str) -> TransportResult<WriteSceneResponse> {
        self.record(Endpoint::WriteNextScene, Some(project_id), None)
            .await;
        self.scripted_or_missing(Endpoint::WriteNextScene)
    }

    async fn stream_next_scene(&self, project_id: &str) -> Result<SceneEventStream, StreamError> {
        self.record(Endpoint::StreamNextScene, Some(project_id), None)
            .await;

        let script = self
            .lock()
            .streams
            .pop_front()
            .ok_or_else(|| StreamError::connection("no scripted stream"))?;
        let events = script.opened?;
        let hold_open = script.hold_open;

        self.stream_closed.store(false, Ordering::SeqCst);
        let closed = self.stream_closed.clone();
        let stream = async_stream::stream! {
            let _guard = CloseGuard(closed);
            for event in events {
                yield event;
            }
            if hold_open {
                std::future::pending::<()>().await;
            }
        };

        Ok(Box::pin(stream))
    }

    async fn revise_scene(
        &self,
        project_id: &str,
        request: &ReviseSceneRequest,
    ) -> TransportResult<SceneResponse> {
        self.record(Endpoint::ReviseScene, Some(project_id), body_of(request))
            .await;
        self.scripted_or_missing(Endpoint::ReviseScene)
    }

    async fn expand_scene(
        &self,
        project_id: &str,
        scene_number: u32,
    ) -> TransportResult<SceneResponse> {
        let body = serde_json::json!({ "scene_number": scene_number });
        self.record(Endpoint::ExpandScene, Some(project_id), Some(body))
            .await;
        self.scripted_or_missing(Endpoint::ExpandScene)
    }

    async fn approve_scene(&self, project_id: &str, scene_number: u32) -> TransportResult<Ack> {
        let body = serde_json::json!({ "scene_number": scene_number });
        self.record(Endpoint::ApproveScene, Some(project_id), Some(body))
            .await;
        self.scripted(Endpoint::ApproveScene).unwrap_or_else(|| {
            Ok(Ack {
                success: true,
                message: format!("Scene {scene_number} approved"),
            })
        })
    }

    async fn optimize(&self, project_id: &str) -> TransportResult<OptimizationResponse> {
        self.record(Endpoint::Optimize, Some(project_id), None).await;
        self.scripted_or_missing(Endpoint::Optimize)
    }

    async fn export(
        &self,
        project_id: &str,
        format: ExportFormat,
    ) -> TransportResult<ExportOutput> {
        let body = serde_json::json!({ "format": format.as_str() });
        self.record(Endpoint::Export, Some(project_id), Some(body))
            .await;
        self.scripted_or_missing(Endpoint::Export)
    }

    async fn project_status(&self, project_id: &str) -> TransportResult<serde_json::Value> {
        self.record(Endpoint::ProjectStatus, Some(project_id), None)
            .await;
        self.scripted_or_missing(Endpoint::ProjectStatus)
    }

    async fn context_status(&self, project_id: &str) -> TransportResult<ContextStatus> {
        self.record(Endpoint::ContextStatus, Some(project_id), None)
            .await;
        self.scripted_or_missing(Endpoint::ContextStatus)
    }

    async fn health(&self) -> TransportResult<HealthStatus> {
        self.record(Endpoint::Health, None, None).await;
        self.scripted(Endpoint::Health).unwrap_or_else(|| {
            Ok(HealthStatus {
                status: "healthy".to_string(),
                api_key_configured: true,
                projects_count: 0,
            })
        })
    }
}
