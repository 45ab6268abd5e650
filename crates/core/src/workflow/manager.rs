//! Workflow manager driving a screenplay project through the pipeline.
//!
//! The WorkflowManager is the single owner of client-side workflow state. It
//! issues backend calls, reconciles their results into the artifact bundle,
//! tracks the pipeline step and publishes every change as an `Event`.
//!
//! Every mutating operation follows the same contract:
//! - the in-flight counter is raised on entry and lowered on exit
//! - the shared error message is cleared on entry and set on failure
//! - a response for a project that is no longer current is discarded

use crate::config::{ApprovalPolicy, ClientConfig};
use crate::reconcile::{replace_by_key, replace_scene, retain_outlined, upsert_scene, with_status};
use crate::streaming::subscription::cancelled;
use crate::streaming::{CancelHandle, Feed, SceneStreamSubscription, StreamOutcome};
use crate::transport::{Backend, SourceFile, StreamError, TransportError};
use crate::workflow::error::{ValidationError, WorkflowResult};
use crate::workflow::stage::resume_step;
use crate::workflow::state::{Artifacts, WorkflowState};
use sk_protocol::{
    BeatSheet, CharacterCard, ContextStatus, CreateProjectRequest, Event, ExportFormat,
    ExportOutput, FilmConcept, HealthStatus, Methodology, MethodologyDetail, Op,
    OptimizationReport, ProjectDetail, ProjectSummary, ReviseSceneRequest, Scene, SceneOutline,
    SceneStatus, SelectConceptRequest, UploadResponse, WorkflowStep,
};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_stream::StreamExt;
use uuid::Uuid;

/// Result of asking the backend for the next scene.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Written {
        scene: Arc<Scene>,
        quality_notes: Option<String>,
        user_guidance: Option<String>,
    },
    /// Every outlined scene is already written.
    AllScenesCompleted { message: Option<String> },
    /// The user left the project while the request was in flight; the
    /// response was dropped.
    Superseded,
}

/// Result of a dispatched `Op`.
#[derive(Debug)]
pub enum OpOutput {
    Done,
    ProjectCreated { project_id: String },
    Scene(Arc<Scene>),
    Write(WriteOutcome),
    Stream(SceneStreamSubscription),
    Export(ExportOutput),
}

/// Which kind of load fetched a project.
#[derive(Debug, Clone, Copy)]
enum LoadTicket {
    /// An explicit selection. Any later selection supersedes it.
    Select(u64),
    /// A refresh of the project that was current when it started.
    Reload(u64),
}

enum StreamEnding {
    Completed,
    Failed(StreamError),
    Cancelled,
}

/// Drives one client's view of the screenplay pipeline.
#[derive(Clone)]
pub struct WorkflowManager {
    backend: Arc<dyn Backend>,
    config: Arc<ClientConfig>,
    state: Arc<Mutex<WorkflowState>>,
    /// The stream currently allowed to feed the accumulator.
    active_stream: Arc<Mutex<Option<(Uuid, CancelHandle)>>>,
    events_tx: mpsc::UnboundedSender<Event>,
}

impl WorkflowManager {
    /// Create a manager with empty state.
    ///
    /// # Arguments
    ///
    /// * `backend` - The generation backend
    /// * `config` - Client configuration (approval policy, defaults)
    /// * `events_tx` - Channel receiving every state change
    pub fn new(
        backend: Arc<dyn Backend>,
        config: ClientConfig,
        events_tx: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            backend,
            config: Arc::new(config),
            state: Arc::new(Mutex::new(WorkflowState::default())),
            active_stream: Arc::new(Mutex::new(None)),
            events_tx,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> WorkflowState {
        self.state.lock().await.clone()
    }

    pub async fn current_project_id(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .current_project_id()
            .map(str::to_string)
    }

    /// A project-creation request filled with the configured defaults.
    pub fn new_project_request(&self, name: impl Into<String>) -> CreateProjectRequest {
        CreateProjectRequest {
            name: name.into(),
            target_duration_minutes: self.config.default_duration_minutes,
            methodology: self.config.default_methodology.clone(),
            language: self.config.default_language.clone(),
        }
    }

    fn emit(&self, event: Event) {
        // Nobody listening is fine; state stays authoritative.
        let _ = self.events_tx.send(event);
    }

    fn set_step(&self, state: &mut WorkflowState, step: WorkflowStep) {
        if state.step != step {
            tracing::debug!(from = %state.step, to = %step, "workflow step changed");
            state.step = step;
            self.emit(Event::StepChanged { step });
        }
    }

    async fn enter(&self) {
        let mut state = self.state.lock().await;
        state.in_flight += 1;
        if state.in_flight == 1 {
            self.emit(Event::BusyChanged { busy: true });
        }
        if state.error.take().is_some() {
            self.emit(Event::ErrorCleared);
        }
    }

    async fn leave<T>(&self, op: &'static str, result: &WorkflowResult<T>) {
        let mut state = self.state.lock().await;
        state.in_flight = state.in_flight.saturating_sub(1);
        if let Err(e) = result {
            tracing::warn!(op, error = %e, "workflow operation failed");
            let message = e.to_string();
            state.error = Some(message.clone());
            self.emit(Event::ErrorRaised { message });
        }
        if state.in_flight == 0 {
            self.emit(Event::BusyChanged { busy: false });
        }
    }

    /// Run `fut` under the busy/error contract.
    async fn run<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = WorkflowResult<T>>,
    ) -> WorkflowResult<T> {
        tracing::debug!(op, "workflow operation started");
        self.enter().await;
        let result = fut.await;
        self.leave(op, &result).await;
        result
    }

    /// Apply a backend result, unless the user moved to another project
    /// while it was in flight. Returns whether it was applied.
    async fn apply_for<F>(&self, project_id: &str, op: &'static str, apply: F) -> WorkflowResult<bool>
    where
        F: FnOnce(&mut WorkflowState) -> WorkflowResult<()>,
    {
        let mut state = self.state.lock().await;
        if state.current_project_id() != Some(project_id) {
            tracing::info!(op, project_id, "discarding response for a project that is no longer current");
            return Ok(false);
        }
        apply(&mut *state)?;
        Ok(true)
    }

    async fn require_project(&self) -> WorkflowResult<String> {
        self.current_project_id()
            .await
            .ok_or_else(|| ValidationError::NoActiveProject.into())
    }

    async fn require_scene(&self, scene_number: u32) -> WorkflowResult<String> {
        let state = self.state.lock().await;
        let project_id = state
            .current_project_id()
            .ok_or(ValidationError::NoActiveProject)?
            .to_string();
        if state.artifacts.scene(scene_number).is_none() {
            return Err(ValidationError::UnknownScene(scene_number).into());
        }
        Ok(project_id)
    }

    // ==================== Projects ====================

    /// Replace the project list with the backend's.
    pub async fn load_projects(&self) -> WorkflowResult<Vec<ProjectSummary>> {
        self.run("load_projects", async {
            let projects = self.backend.list_projects().await?;
            self.store_projects(projects.clone()).await;
            Ok(projects)
        })
        .await
    }

    async fn store_projects(&self, projects: Vec<ProjectSummary>) {
        let mut state = self.state.lock().await;
        state.projects = projects.clone();
        self.emit(Event::ProjectsLoaded { projects });
    }

    /// Create a project, refresh the list, and return the new project's id.
    pub async fn create_project(&self, request: CreateProjectRequest) -> WorkflowResult<String> {
        if request.name.trim().is_empty() {
            return Err(ValidationError::EmptyProjectName.into());
        }

        self.run("create_project", async {
            let created = self.backend.create_project(&request).await?;
            tracing::info!(project_id = %created.id, name = %created.name, "project created");
            let projects = self.backend.list_projects().await?;
            self.store_projects(projects).await;
            Ok(created.id)
        })
        .await
    }

    /// Make a project current and load its artifact bundle.
    ///
    /// The pipeline step is derived from which artifacts exist.
    ///
    /// When selections overlap, the one requested last wins regardless of
    /// which response arrives last.
    pub async fn select_project(&self, project_id: &str) -> WorkflowResult<()> {
        let ticket = LoadTicket::Select(self.next_load_generation().await);
        self.run("select_project", async {
            let detail = self.backend.get_project(project_id).await?;
            self.install_project(detail, ticket).await;
            Ok(())
        })
        .await
    }

    /// Refetch `project_id`. The result is dropped if another selection
    /// happened after `generation` was read, or the project is no longer
    /// current.
    async fn reload_project(&self, project_id: &str, generation: u64) -> WorkflowResult<()> {
        self.run("reload_project", async {
            let detail = self.backend.get_project(project_id).await?;
            self.install_project(detail, LoadTicket::Reload(generation))
                .await;
            Ok(())
        })
        .await
    }

    async fn next_load_generation(&self) -> u64 {
        let mut state = self.state.lock().await;
        state.load_generation += 1;
        state.load_generation
    }

    async fn install_project(&self, detail: ProjectDetail, ticket: LoadTicket) {
        let mut state = self.state.lock().await;
        let project_id = detail.project.id.clone();

        let stale = match ticket {
            LoadTicket::Select(generation) => generation != state.load_generation,
            LoadTicket::Reload(generation) => {
                generation != state.load_generation
                    || state.current_project_id() != Some(project_id.as_str())
            }
        };
        if stale {
            tracing::info!(%project_id, ?ticket, "discarding superseded project load");
            return;
        }

        let switching = state.current_project_id() != Some(project_id.as_str());

        let mut artifacts = Artifacts::from_screenplay(detail.screenplay.unwrap_or_default());
        if switching {
            self.cancel_active_stream().await;
            state.stream.reset();
        } else {
            artifacts.optimization_report = state.artifacts.optimization_report.take();
        }

        let step = resume_step(artifacts.resume_signals(detail.project.has_source()));
        let scene_count = artifacts.scenes.len();
        let context_status = detail.context_status.map(ContextStatus::recomputed);

        state.current_scene_index = scene_count.saturating_sub(1);
        state.artifacts = artifacts;
        state.context_status = context_status.clone();
        state.current_project = Some(detail.project);

        tracing::info!(%project_id, %step, scenes = scene_count, "project loaded");
        self.emit(Event::ProjectSelected { project_id });
        self.set_step(&mut state, step);
        self.emit(Event::ScenesUpdated { count: scene_count });
        if let Some(status) = context_status {
            self.emit(Event::ContextStatusUpdated { status });
        }
    }

    /// Delete a project. If it was current, the current project is cleared.
    pub async fn delete_project(&self, project_id: &str) -> WorkflowResult<()> {
        self.run("delete_project", async {
            self.backend.delete_project(project_id).await?;
            tracing::info!(project_id, "project deleted");

            {
                let mut state = self.state.lock().await;
                if state.current_project_id() == Some(project_id) {
                    self.cancel_active_stream().await;
                    state.stream.reset();
                    state.load_generation += 1;
                    state.clear_project();
                    self.emit(Event::ProjectCleared);
                    self.emit(Event::StepChanged { step: state.step });
                }
            }

            let projects = self.backend.list_projects().await?;
            self.store_projects(projects).await;
            Ok(())
        })
        .await
    }

    /// Leave the current project.
    pub async fn navigate_home(&self) {
        let mut state = self.state.lock().await;
        self.cancel_active_stream().await;
        state.stream.reset();
        state.load_generation += 1;
        state.clear_project();
        self.emit(Event::ProjectCleared);
        self.emit(Event::StepChanged { step: state.step });
    }

    /// Drop all client-side state. Operations still in flight keep counting.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        self.cancel_active_stream().await;
        let in_flight = state.in_flight;
        let load_generation = state.load_generation + 1;
        let had_error = state.error.is_some();
        *state = WorkflowState {
            in_flight,
            load_generation,
            ..WorkflowState::default()
        };
        self.emit(Event::ProjectCleared);
        if had_error {
            self.emit(Event::ErrorCleared);
        }
        self.emit(Event::StepChanged { step: state.step });
    }

    pub async fn dismiss_error(&self) {
        if self.state.lock().await.error.take().is_some() {
            self.emit(Event::ErrorCleared);
        }
    }

    // ==================== Pipeline ====================

    /// Upload the source material for the current project.
    pub async fn upload_source(&self, source: SourceFile) -> WorkflowResult<UploadResponse> {
        let project_id = self.require_project().await?;

        self.run("upload_source", async {
            let response = self.backend.upload_source(&project_id, source).await?;
            self.apply_for(&project_id, "upload_source", |state| {
                if let Some(project) = state.current_project.as_mut() {
                    project.source_file_uri = Some(response.file_uri.clone());
                    project.source_file_name = Some(response.file_name.clone());
                }
                self.set_step(state, WorkflowStep::Analyze);
                Ok(())
            })
            .await?;
            Ok(response)
        })
        .await
    }

    /// Analyze the uploaded source and replace the concept list.
    pub async fn analyze_source(&self) -> WorkflowResult<Vec<FilmConcept>> {
        let project_id = self.require_project().await?;

        self.run("analyze_source", async {
            let response = self.backend.analyze(&project_id).await?;
            self.apply_for(&project_id, "analyze_source", |state| {
                state.artifacts.concepts = response.concepts.clone();
                if !response.source_summary.is_empty() {
                    state.artifacts.source_summary = Some(response.source_summary.clone());
                }
                self.set_step(state, WorkflowStep::SelectConcept);
                Ok(())
            })
            .await?;
            Ok(response.concepts)
        })
        .await
    }

    /// Pick a concept; the backend answers with the protagonist.
    pub async fn select_concept(&self, index: usize) -> WorkflowResult<CharacterCard> {
        let project_id = {
            let state = self.state.lock().await;
            let project_id = state
                .current_project_id()
                .ok_or(ValidationError::NoActiveProject)?
                .to_string();
            let available = state.artifacts.concepts.len();
            if index >= available {
                return Err(ValidationError::ConceptOutOfRange { index, available }.into());
            }
            project_id
        };

        self.run("select_concept", async {
            let request = SelectConceptRequest {
                concept_index: index,
                duration_minutes: None,
            };
            let response = self.backend.select_concept(&project_id, &request).await?;
            self.apply_for(&project_id, "select_concept", |state| {
                state.artifacts.protagonist = Some(response.protagonist.clone());
                state.artifacts.selected_concept_index = Some(index);
                self.set_step(state, WorkflowStep::CharacterCard);
                Ok(())
            })
            .await?;
            Ok(response.protagonist)
        })
        .await
    }

    /// Generate the beat sheet. A blank methodology uses the configured one.
    pub async fn create_beat_sheet(&self, methodology: &str) -> WorkflowResult<BeatSheet> {
        let project_id = self.require_project().await?;
        let methodology = match methodology.trim() {
            "" => self.config.default_methodology.clone(),
            m => m.to_string(),
        };

        self.run("create_beat_sheet", async {
            let response = self
                .backend
                .create_beat_sheet(&project_id, &methodology)
                .await?;
            self.apply_for(&project_id, "create_beat_sheet", |state| {
                state.artifacts.beat_sheet = Some(response.beat_sheet.clone());
                self.set_step(state, WorkflowStep::BeatSheet);
                Ok(())
            })
            .await?;
            Ok(response.beat_sheet)
        })
        .await
    }

    /// Replace the beat sheet with an edited version.
    pub async fn update_beat_sheet(&self, beat_sheet: BeatSheet) -> WorkflowResult<()> {
        let project_id = self.require_project().await?;

        self.run("update_beat_sheet", async {
            self.backend
                .update_beat_sheet(&project_id, &beat_sheet)
                .await?;
            self.apply_for(&project_id, "update_beat_sheet", |state| {
                state.artifacts.beat_sheet = Some(beat_sheet);
                Ok(())
            })
            .await?;
            Ok(())
        })
        .await
    }

    /// Generate the scene outlines. Written scenes that lose their outline
    /// are dropped.
    pub async fn create_scene_outlines(&self) -> WorkflowResult<Vec<SceneOutline>> {
        let project_id = self.require_project().await?;

        self.run("create_scene_outlines", async {
            let response = self.backend.create_scene_outlines(&project_id).await?;
            self.apply_for(&project_id, "create_scene_outlines", |state| {
                let scenes = retain_outlined(&response.outlines, state.artifacts.scenes.clone());
                state.artifacts.scene_outlines = response.outlines.clone();
                state.artifacts.scenes = scenes;
                state.current_scene_index = state
                    .current_scene_index
                    .min(state.artifacts.scenes.len().saturating_sub(1));
                self.set_step(state, WorkflowStep::SceneOutline);
                self.emit(Event::ScenesUpdated {
                    count: state.artifacts.scenes.len(),
                });
                Ok(())
            })
            .await?;
            Ok(response.outlines)
        })
        .await
    }

    /// Write the next scene in one request.
    ///
    /// On success the context status is refreshed; a failed refresh is only
    /// logged.
    pub async fn write_next_scene(&self) -> WorkflowResult<WriteOutcome> {
        let project_id = self.require_project().await?;

        let outcome = self
            .run("write_next_scene", async {
                let response = self.backend.write_next_scene(&project_id).await?;

                if response.all_scenes_completed {
                    let applied = self
                        .apply_for(&project_id, "write_next_scene", |state| {
                            self.set_step(state, WorkflowStep::Optimization);
                            Ok(())
                        })
                        .await?;
                    if !applied {
                        return Ok(WriteOutcome::Superseded);
                    }
                    return Ok(WriteOutcome::AllScenesCompleted {
                        message: response.message,
                    });
                }

                let scene = response.scene.map(Arc::new).ok_or_else(|| {
                    TransportError::Decode("response carried neither a scene nor completion".into())
                })?;

                let applied = self
                    .apply_for(&project_id, "write_next_scene", |state| {
                        let (scenes, index) = upsert_scene(
                            &state.artifacts.scene_outlines,
                            &state.artifacts.scenes,
                            scene.clone(),
                        )?;
                        state.artifacts.scenes = scenes;
                        state.current_scene_index = index;
                        self.set_step(state, WorkflowStep::Writing);
                        self.emit(Event::ScenesUpdated {
                            count: state.artifacts.scenes.len(),
                        });
                        Ok(())
                    })
                    .await?;
                if !applied {
                    return Ok(WriteOutcome::Superseded);
                }

                tracing::info!(scene_number = scene.scene_number, "scene written");
                Ok(WriteOutcome::Written {
                    scene,
                    quality_notes: response.quality_notes,
                    user_guidance: response.user_guidance,
                })
            })
            .await?;

        if matches!(outcome, WriteOutcome::Written { .. }) {
            self.refresh_context_status().await;
        }
        Ok(outcome)
    }

    /// Approve a scene according to the configured approval policy.
    pub async fn approve_scene(&self, scene_number: u32) -> WorkflowResult<()> {
        let project_id = self.require_scene(scene_number).await?;
        let policy = self.config.approval_policy;

        self.run("approve_scene", async {
            let flipped = match policy {
                ApprovalPolicy::Optimistic | ApprovalPolicy::OptimisticRollback => {
                    self.mark_approved(&project_id, scene_number).await?
                }
                ApprovalPolicy::Confirmed => None,
            };

            match self.backend.approve_scene(&project_id, scene_number).await {
                Ok(_) => {
                    if policy == ApprovalPolicy::Confirmed {
                        self.mark_approved(&project_id, scene_number).await?;
                    }
                    tracing::info!(scene_number, "scene approved");
                    Ok(())
                }
                Err(e) => {
                    if let (ApprovalPolicy::OptimisticRollback, Some((previous, approved))) =
                        (policy, flipped)
                    {
                        self.roll_back_scene(&project_id, previous, approved).await;
                    }
                    Err(e.into())
                }
            }
        })
        .await
    }

    /// Flip a scene to approved. Returns the (previous, approved) pair when
    /// anything changed.
    async fn mark_approved(
        &self,
        project_id: &str,
        scene_number: u32,
    ) -> WorkflowResult<Option<(Arc<Scene>, Arc<Scene>)>> {
        let mut swapped = None;
        self.apply_for(project_id, "approve_scene", |state| {
            let previous = state
                .artifacts
                .scene(scene_number)
                .cloned()
                .ok_or(ValidationError::UnknownScene(scene_number))?;
            let scenes = with_status(&state.artifacts.scenes, scene_number, SceneStatus::Approved)?;
            let approved = scenes.iter().find(|s| s.scene_number == scene_number).cloned();

            if let Some(approved) = approved.filter(|a| !Arc::ptr_eq(a, &previous)) {
                state.artifacts.scenes = scenes;
                self.emit(Event::ScenesUpdated {
                    count: state.artifacts.scenes.len(),
                });
                swapped = Some((previous, approved));
            }
            Ok(())
        })
        .await?;
        Ok(swapped)
    }

    /// Restore `previous` if the scene is still the one we flipped.
    async fn roll_back_scene(&self, project_id: &str, previous: Arc<Scene>, approved: Arc<Scene>) {
        let scene_number = previous.scene_number;
        let result = self
            .apply_for(project_id, "approve_scene", |state| {
                let untouched = state
                    .artifacts
                    .scene(scene_number)
                    .is_some_and(|s| Arc::ptr_eq(s, &approved));
                if !untouched {
                    return Ok(());
                }
                if let Some(scenes) = replace_by_key(
                    &state.artifacts.scenes,
                    &scene_number,
                    |s| s.scene_number,
                    previous,
                ) {
                    state.artifacts.scenes = scenes;
                    self.emit(Event::ScenesUpdated {
                        count: state.artifacts.scenes.len(),
                    });
                }
                Ok(())
            })
            .await;

        match result {
            Ok(true) => tracing::info!(scene_number, "approval rolled back"),
            Ok(false) => {}
            Err(e) => tracing::warn!(scene_number, error = %e, "approval rollback failed"),
        }
    }

    /// Ask the backend to lengthen a scene.
    pub async fn expand_scene(&self, scene_number: u32) -> WorkflowResult<Arc<Scene>> {
        let project_id = self.require_scene(scene_number).await?;

        self.run("expand_scene", async {
            let response = self.backend.expand_scene(&project_id, scene_number).await?;
            self.install_rewritten_scene(&project_id, "expand_scene", scene_number, response.scene)
                .await
        })
        .await
    }

    /// Rewrite a scene following the user's notes.
    pub async fn revise_scene(&self, scene_number: u32, notes: &str) -> WorkflowResult<Arc<Scene>> {
        let notes = notes.trim();
        if notes.is_empty() {
            return Err(ValidationError::EmptyRevisionNotes.into());
        }
        let project_id = self.require_scene(scene_number).await?;

        self.run("revise_scene", async {
            let request = ReviseSceneRequest {
                scene_number,
                revision_notes: notes.to_string(),
            };
            let response = self.backend.revise_scene(&project_id, &request).await?;
            self.install_rewritten_scene(&project_id, "revise_scene", scene_number, response.scene)
                .await
        })
        .await
    }

    async fn install_rewritten_scene(
        &self,
        project_id: &str,
        op: &'static str,
        scene_number: u32,
        scene: Scene,
    ) -> WorkflowResult<Arc<Scene>> {
        let scene = Arc::new(scene);
        self.apply_for(project_id, op, |state| {
            let scenes = replace_scene(&state.artifacts.scenes, scene_number, scene.clone())?;
            state.artifacts.scenes = scenes;
            self.emit(Event::ScenesUpdated {
                count: state.artifacts.scenes.len(),
            });
            Ok(())
        })
        .await?;
        Ok(scene)
    }

    /// Run the whole-screenplay review; the pipeline is complete afterwards.
    pub async fn run_optimization(&self) -> WorkflowResult<OptimizationReport> {
        let project_id = self.require_project().await?;

        self.run("run_optimization", async {
            let response = self.backend.optimize(&project_id).await?;
            self.apply_for(&project_id, "run_optimization", |state| {
                state.artifacts.optimization_report = Some(response.report.clone());
                self.set_step(state, WorkflowStep::Complete);
                Ok(())
            })
            .await?;
            tracing::info!(
                score = response.report.overall_score,
                issues = response.report.issue_count(),
                "optimization finished"
            );
            Ok(response.report)
        })
        .await
    }

    pub async fn export(&self, format: ExportFormat) -> WorkflowResult<ExportOutput> {
        let project_id = self.require_project().await?;
        self.run("export", async {
            Ok(self.backend.export(&project_id, format).await?)
        })
        .await
    }

    /// Backend's own progress report for the current project.
    pub async fn project_status(&self) -> WorkflowResult<serde_json::Value> {
        let project_id = self.require_project().await?;
        self.run("project_status", async {
            Ok(self.backend.project_status(&project_id).await?)
        })
        .await
    }

    /// Fetch fresh context-window usage. Failures are logged, never surfaced.
    pub async fn refresh_context_status(&self) -> Option<ContextStatus> {
        let project_id = self.current_project_id().await?;

        match self.backend.context_status(&project_id).await {
            Ok(status) => {
                let status = status.recomputed();
                let applied = self
                    .apply_for(&project_id, "refresh_context_status", |state| {
                        state.context_status = Some(status.clone());
                        self.emit(Event::ContextStatusUpdated {
                            status: status.clone(),
                        });
                        Ok(())
                    })
                    .await;
                applied.ok().filter(|applied| *applied).map(|_| status)
            }
            Err(e) => {
                tracing::warn!(%project_id, error = %e, "context status refresh failed");
                None
            }
        }
    }

    // ==================== Lookups ====================

    pub async fn health_check(&self) -> WorkflowResult<HealthStatus> {
        Ok(self.backend.health().await?)
    }

    pub async fn list_methodologies(&self) -> WorkflowResult<Vec<Methodology>> {
        Ok(self.backend.list_methodologies().await?)
    }

    pub async fn get_methodology(&self, methodology_id: &str) -> WorkflowResult<MethodologyDetail> {
        Ok(self.backend.get_methodology(methodology_id).await?)
    }

    // ==================== Streaming ====================

    /// Start writing the next scene over the event stream.
    ///
    /// Chunks are published as they arrive. On completion the project is
    /// reloaded once so the scene list picks up the new scene.
    pub async fn stream_next_scene(&self) -> WorkflowResult<SceneStreamSubscription> {
        let stream_id = Uuid::new_v4();
        let (cancel, cancel_rx) = CancelHandle::new();

        let project_id = {
            let mut state = self.state.lock().await;
            let project_id = state
                .current_project_id()
                .ok_or(ValidationError::NoActiveProject)?
                .to_string();
            if state.stream.is_streaming() {
                return Err(ValidationError::StreamAlreadyActive.into());
            }

            state.stream.start(stream_id);
            *self.active_stream.lock().await = Some((stream_id, cancel.clone()));
            if state.error.take().is_some() {
                self.emit(Event::ErrorCleared);
            }
            project_id
        };

        tracing::info!(%stream_id, %project_id, "scene stream started");
        self.emit(Event::StreamStarted { stream_id });

        let manager = self.clone();
        let task = tokio::spawn(async move {
            manager
                .drive_stream(project_id, stream_id, cancel_rx)
                .await
        });

        Ok(SceneStreamSubscription::new(stream_id, cancel, task))
    }

    /// Cancel the active scene stream. Returns whether one was active.
    pub async fn cancel_stream(&self) -> bool {
        self.cancel_active_stream().await
    }

    async fn cancel_active_stream(&self) -> bool {
        match self.active_stream.lock().await.as_ref() {
            Some((stream_id, handle)) => {
                tracing::info!(%stream_id, "cancelling scene stream");
                handle.cancel();
                true
            }
            None => false,
        }
    }

    async fn drive_stream(
        &self,
        project_id: String,
        stream_id: Uuid,
        mut cancel_rx: watch::Receiver<bool>,
    ) -> StreamOutcome {
        let opened = tokio::select! {
            biased;
            _ = cancelled(&mut cancel_rx) => None,
            opened = self.backend.stream_next_scene(&project_id) => Some(opened),
        };

        let mut events = match opened {
            None => return self.finish_stream(&project_id, stream_id, StreamEnding::Cancelled).await,
            Some(Err(e)) => {
                return self
                    .finish_stream(&project_id, stream_id, StreamEnding::Failed(e))
                    .await
            }
            Some(Ok(events)) => events,
        };

        let ending = loop {
            let next = tokio::select! {
                biased;
                _ = cancelled(&mut cancel_rx) => break StreamEnding::Cancelled,
                next = events.next() => next,
            };

            match next {
                None => break StreamEnding::Failed(StreamError::Ended),
                Some(Err(e)) => break StreamEnding::Failed(e),
                Some(Ok(payload)) => match self.feed_stream(stream_id, &payload).await {
                    Feed::Appended => {}
                    Feed::Completed => break StreamEnding::Completed,
                    Feed::Failed(e) => break StreamEnding::Failed(e),
                    Feed::Ignored => break StreamEnding::Cancelled,
                },
            }
        };

        // Close the connection before anything else happens.
        drop(events);
        self.finish_stream(&project_id, stream_id, ending).await
    }

    async fn feed_stream(&self, stream_id: Uuid, payload: &str) -> Feed {
        let mut state = self.state.lock().await;
        if !state.stream.is_current(stream_id) {
            return Feed::Ignored;
        }

        let feed = state.stream.feed(payload);
        if feed == Feed::Appended {
            self.emit(Event::StreamChunk {
                stream_id,
                chunk: payload.to_string(),
            });
        }
        feed
    }

    async fn finish_stream(
        &self,
        project_id: &str,
        stream_id: Uuid,
        ending: StreamEnding,
    ) -> StreamOutcome {
        {
            let mut active = self.active_stream.lock().await;
            if active.as_ref().is_some_and(|(id, _)| *id == stream_id) {
                *active = None;
            }
        }

        let mut state = self.state.lock().await;
        let current = state.stream.is_current(stream_id);

        match ending {
            StreamEnding::Completed => {
                let text = state.stream.text().to_string();
                let reload = current && state.current_project_id() == Some(project_id);
                let generation = state.load_generation;
                if current {
                    self.emit(Event::StreamCompleted { stream_id });
                }
                if reload {
                    self.set_step(&mut state, WorkflowStep::Writing);
                }
                drop(state);

                tracing::info!(%stream_id, chars = text.len(), "scene stream completed");
                if reload {
                    if let Err(e) = self.reload_project(project_id, generation).await {
                        tracing::warn!(%stream_id, error = %e, "reload after stream failed");
                    }
                } else {
                    tracing::info!(%stream_id, "project changed during stream, skipping reload");
                }
                StreamOutcome::Completed(text)
            }
            StreamEnding::Failed(error) => {
                tracing::warn!(%stream_id, error = ?error, "scene stream failed");
                if current {
                    state.stream.fail();
                    let message = error.to_string();
                    state.error = Some(message.clone());
                    self.emit(Event::StreamFailed {
                        stream_id,
                        error: message.clone(),
                    });
                    self.emit(Event::ErrorRaised { message });
                }
                StreamOutcome::Failed(error)
            }
            StreamEnding::Cancelled => {
                if current {
                    state.stream.cancel();
                    self.emit(Event::StreamCancelled { stream_id });
                }
                tracing::info!(%stream_id, "scene stream cancelled");
                StreamOutcome::Cancelled
            }
        }
    }

    // ==================== Dispatch ====================

    /// Execute an `Op` sent by a consumer.
    pub async fn dispatch(&self, op: Op) -> WorkflowResult<OpOutput> {
        tracing::debug!(?op, "dispatching op");
        match op {
            Op::LoadProjects => self.load_projects().await.map(|_| OpOutput::Done),
            Op::CreateProject {
                name,
                target_duration_minutes,
                methodology,
                language,
            } => {
                let request = CreateProjectRequest {
                    name,
                    target_duration_minutes,
                    methodology,
                    language,
                };
                let project_id = self.create_project(request).await?;
                Ok(OpOutput::ProjectCreated { project_id })
            }
            Op::SelectProject { project_id } => {
                self.select_project(&project_id).await.map(|_| OpOutput::Done)
            }
            Op::DeleteProject { project_id } => {
                self.delete_project(&project_id).await.map(|_| OpOutput::Done)
            }
            Op::UploadSource { file_name, content } => self
                .upload_source(SourceFile::new(file_name, content))
                .await
                .map(|_| OpOutput::Done),
            Op::AnalyzeSource => self.analyze_source().await.map(|_| OpOutput::Done),
            Op::SelectConcept { index } => self.select_concept(index).await.map(|_| OpOutput::Done),
            Op::CreateBeatSheet { methodology } => self
                .create_beat_sheet(&methodology)
                .await
                .map(|_| OpOutput::Done),
            Op::UpdateBeatSheet { beat_sheet } => self
                .update_beat_sheet(beat_sheet)
                .await
                .map(|_| OpOutput::Done),
            Op::CreateSceneOutlines => self.create_scene_outlines().await.map(|_| OpOutput::Done),
            Op::WriteNextScene => self.write_next_scene().await.map(OpOutput::Write),
            Op::StreamNextScene => self.stream_next_scene().await.map(OpOutput::Stream),
            Op::CancelStream => {
                self.cancel_stream().await;
                Ok(OpOutput::Done)
            }
            Op::ApproveScene { scene_number } => self
                .approve_scene(scene_number)
                .await
                .map(|_| OpOutput::Done),
            Op::ExpandScene { scene_number } => {
                self.expand_scene(scene_number).await.map(OpOutput::Scene)
            }
            Op::ReviseScene {
                scene_number,
                notes,
            } => self
                .revise_scene(scene_number, &notes)
                .await
                .map(OpOutput::Scene),
            Op::RunOptimization => self.run_optimization().await.map(|_| OpOutput::Done),
            Op::Export { format } => self.export(format).await.map(OpOutput::Export),
            Op::RefreshContextStatus => {
                self.refresh_context_status().await;
                Ok(OpOutput::Done)
            }
            Op::NavigateHome => {
                self.navigate_home().await;
                Ok(OpOutput::Done)
            }
            Op::DismissError => {
                self.dismiss_error().await;
                Ok(OpOutput::Done)
            }
        }
    }
}
