//! Test fixtures for projects, artifact bundles and the workflow harness.

#![allow(dead_code)]

use sk_core::config::{ApprovalPolicy, ClientConfig};
use sk_core::transport::{Endpoint, MockBackend};
use sk_core::workflow::WorkflowManager;
use sk_protocol::{
    Beat, BeatSheet, CharacterCard, ContextStatus, DialogueLine, Event, FilmConcept, Project,
    ProjectDetail, Scene, SceneOutline, SceneStatus, Screenplay,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Create a film concept with the given genre.
pub fn concept(genre: &str) -> FilmConcept {
    FilmConcept {
        genre: genre.to_string(),
        logline: format!("A {genre} story about a lighthouse keeper"),
        tone: "melancholic".to_string(),
        target_audience: Some("adults".to_string()),
        unique_selling_point: None,
    }
}

pub fn protagonist() -> CharacterCard {
    CharacterCard {
        name: "Deniz".to_string(),
        dramatic_need: "Reconcile with her brother".to_string(),
        point_of_view: "Nothing lasts".to_string(),
        attitude: "Guarded".to_string(),
        arc: "From isolation to trust".to_string(),
        backstory: None,
        flaws: Some(vec!["stubborn".to_string()]),
    }
}

pub fn beat_sheet() -> BeatSheet {
    BeatSheet {
        beats: (1..=3)
            .map(|n| Beat {
                number: n,
                name: format!("Beat {n}"),
                description: "Something happens".to_string(),
                estimated_duration_seconds: 120,
                key_moment: None,
            })
            .collect(),
        total_duration_minutes: 6,
        act_one_end: 1,
        midpoint: 2,
        act_two_end: 3,
    }
}

pub fn outline(n: u32) -> SceneOutline {
    SceneOutline {
        scene_number: n,
        location: format!("LIGHTHOUSE {n}"),
        time_of_day: "NIGHT".to_string(),
        duration_seconds: 120,
        brief_description: format!("Scene {n} outline"),
        beat_reference: Some(n),
        emotional_arc: None,
    }
}

pub fn outlines(count: u32) -> Vec<SceneOutline> {
    (1..=count).map(outline).collect()
}

pub fn scene(n: u32) -> Scene {
    Scene {
        scene_number: n,
        header: format!("INT. LIGHTHOUSE {n} - NIGHT"),
        action: "Waves hit the rocks.".to_string(),
        dialogue: vec![DialogueLine {
            character: "DENIZ".to_string(),
            line: "Kimse gelmeyecek.".to_string(),
            parenthetical: None,
        }],
        duration_seconds: 110,
        status: SceneStatus::Draft,
        revision_count: 0,
        notes: None,
    }
}

/// A screenplay that has reached the writing stage.
pub fn screenplay(outline_count: u32, written: &[u32]) -> Screenplay {
    Screenplay {
        title: "Fener".to_string(),
        source_summary: Some("A keeper and a storm".to_string()),
        concepts: vec![concept("drama"), concept("thriller")],
        selected_concept_index: Some(0),
        protagonist: Some(protagonist()),
        beat_sheet: Some(beat_sheet()),
        scene_outlines: outlines(outline_count),
        scenes: written.iter().map(|n| scene(*n)).collect(),
        ..Default::default()
    }
}

pub fn project(id: &str) -> Project {
    let mut project = Project::new(id, format!("Project {id}"));
    project.source_file_uri = Some(format!("files/{id}/novel.pdf"));
    project.source_file_name = Some("novel.pdf".to_string());
    project
}

pub fn project_detail(id: &str, screenplay: Option<Screenplay>) -> ProjectDetail {
    ProjectDetail {
        project: project(id),
        screenplay,
        context_status: None,
    }
}

pub fn context_status(current_tokens: u64, max_tokens: u64) -> ContextStatus {
    ContextStatus::from_tokens(current_tokens, max_tokens)
}

/// A workflow manager wired to a scripted backend.
pub struct Harness {
    pub backend: Arc<MockBackend>,
    pub manager: WorkflowManager,
    pub events: mpsc::UnboundedReceiver<Event>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_policy(policy: ApprovalPolicy) -> Self {
        Self::with_config(ClientConfig {
            approval_policy: policy,
            ..ClientConfig::default()
        })
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let backend = Arc::new(MockBackend::new());
        let (events_tx, events) = mpsc::unbounded_channel();
        let manager = WorkflowManager::new(backend.clone(), config, events_tx);
        Self {
            backend,
            manager,
            events,
        }
    }

    /// Store `detail` in the backend and make it the current project.
    pub async fn open(&mut self, detail: ProjectDetail) {
        let id = detail.project.id.clone();
        self.backend.insert_project(detail);
        self.manager
            .select_project(&id)
            .await
            .expect("Failed to select project");
        self.drain();
    }

    /// Yield until the backend has seen `count` calls to `endpoint`.
    pub async fn wait_for_calls(&self, endpoint: Endpoint, count: usize) {
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while self.backend.call_count(endpoint) < count {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("backend call never arrived");
    }

    /// Take every event published so far.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
