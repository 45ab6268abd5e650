//! Client-side workflow state and the views derived from it.

use crate::reconcile::retain_outlined;
use crate::streaming::SceneAccumulator;
use crate::workflow::stage::{resume_step, ResumeSignals};
use sk_protocol::{
    BeatSheet, CharacterCard, ContextStatus, FilmConcept, OptimizationReport, Project,
    ProjectSummary, Scene, SceneOutline, SceneStatus, Screenplay, WorkflowStep,
};
use std::sync::Arc;

/// Everything the pipeline has produced for the current project.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifacts {
    pub title: String,
    pub source_summary: Option<String>,
    pub concepts: Vec<FilmConcept>,
    pub selected_concept_index: Option<usize>,
    pub protagonist: Option<CharacterCard>,
    pub beat_sheet: Option<BeatSheet>,
    pub scene_outlines: Vec<SceneOutline>,
    /// Written scenes, a subset of the outlines by scene number.
    pub scenes: Vec<Arc<Scene>>,
    pub optimization_report: Option<OptimizationReport>,
}

impl Artifacts {
    /// Build the bundle from a loaded screenplay. Scenes without an outline
    /// are dropped.
    pub fn from_screenplay(screenplay: Screenplay) -> Self {
        let scenes = screenplay.scenes.into_iter().map(Arc::new).collect();
        let scenes = retain_outlined(&screenplay.scene_outlines, scenes);

        Self {
            title: screenplay.title,
            source_summary: screenplay.source_summary,
            concepts: screenplay.concepts,
            selected_concept_index: screenplay.selected_concept_index,
            protagonist: screenplay.protagonist,
            beat_sheet: screenplay.beat_sheet,
            scene_outlines: screenplay.scene_outlines,
            scenes,
            optimization_report: None,
        }
    }

    pub fn resume_signals(&self, has_source: bool) -> ResumeSignals {
        ResumeSignals {
            has_scenes: !self.scenes.is_empty(),
            has_outlines: !self.scene_outlines.is_empty(),
            has_beat_sheet: self.beat_sheet.is_some(),
            has_protagonist: self.protagonist.is_some(),
            has_concepts: !self.concepts.is_empty(),
            has_source,
        }
    }

    pub fn scene(&self, scene_number: u32) -> Option<&Arc<Scene>> {
        self.scenes.iter().find(|s| s.scene_number == scene_number)
    }
}

/// Snapshot of everything a presentation layer needs to render.
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    pub projects: Vec<ProjectSummary>,
    pub current_project: Option<Project>,
    pub artifacts: Artifacts,
    /// Index of the scene last produced by the writer.
    pub current_scene_index: usize,
    pub context_status: Option<ContextStatus>,
    pub step: WorkflowStep,
    pub error: Option<String>,
    pub stream: SceneAccumulator,
    pub(crate) in_flight: usize,
    /// Bumped by every project selection; a load tagged with an older value
    /// is stale.
    pub(crate) load_generation: u64,
}

impl WorkflowState {
    pub fn current_project_id(&self) -> Option<&str> {
        self.current_project.as_ref().map(|p| p.id.as_str())
    }

    /// Whether any operation is still waiting on the backend.
    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Stage derived from the loaded artifacts, ignoring the current step.
    pub fn resume_step(&self) -> WorkflowStep {
        let has_source = self
            .current_project
            .as_ref()
            .is_some_and(Project::has_source);
        resume_step(self.artifacts.resume_signals(has_source))
    }

    /// Zero-based position of the current step in the pipeline.
    pub fn step_index(&self) -> usize {
        self.step.index()
    }

    /// Steps already behind the current one.
    pub fn completed_steps(&self) -> &'static [WorkflowStep] {
        let all: &'static [WorkflowStep] = &WorkflowStep::ALL;
        &all[..self.step.index()]
    }

    pub fn scenes_written(&self) -> usize {
        self.artifacts.scenes.len()
    }

    pub fn total_scenes(&self) -> usize {
        self.artifacts.scene_outlines.len()
    }

    /// Share of outlined scenes already written, in percent.
    pub fn writing_progress(&self) -> f64 {
        let total = self.total_scenes();
        if total == 0 {
            return 0.0;
        }
        self.scenes_written() as f64 / total as f64 * 100.0
    }

    pub fn approved_count(&self) -> usize {
        self.artifacts
            .scenes
            .iter()
            .filter(|s| s.status == SceneStatus::Approved)
            .count()
    }

    /// True only when every outlined scene is written and approved.
    pub fn all_scenes_approved(&self) -> bool {
        self.total_scenes() > 0 && self.approved_count() == self.total_scenes()
    }

    /// The first outline that has no written scene yet.
    pub fn next_outline(&self) -> Option<&SceneOutline> {
        self.artifacts
            .scene_outlines
            .iter()
            .find(|o| self.artifacts.scene(o.scene_number).is_none())
    }

    /// Combined duration of the written scenes.
    pub fn written_duration_seconds(&self) -> u32 {
        self.artifacts
            .scenes
            .iter()
            .map(|s| s.duration_seconds)
            .sum()
    }

    /// Scene last produced by the writer, if any.
    pub fn current_scene(&self) -> Option<&Arc<Scene>> {
        self.artifacts.scenes.get(self.current_scene_index)
    }

    pub(crate) fn clear_project(&mut self) {
        self.current_project = None;
        self.artifacts = Artifacts::default();
        self.current_scene_index = 0;
        self.context_status = None;
        self.step = WorkflowStep::Upload;
    }
}
