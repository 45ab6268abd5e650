//! Stage derivation for resumed projects.

use sk_protocol::WorkflowStep;

/// Which artifacts a loaded project already has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResumeSignals {
    pub has_scenes: bool,
    pub has_outlines: bool,
    pub has_beat_sheet: bool,
    pub has_protagonist: bool,
    pub has_concepts: bool,
    pub has_source: bool,
}

/// The stage a project resumes at.
///
/// The most advanced artifact present wins, regardless of which earlier
/// artifacts are missing.
pub fn resume_step(signals: ResumeSignals) -> WorkflowStep {
    if signals.has_scenes {
        WorkflowStep::Writing
    } else if signals.has_outlines {
        WorkflowStep::SceneOutline
    } else if signals.has_beat_sheet {
        WorkflowStep::BeatSheet
    } else if signals.has_protagonist {
        WorkflowStep::CharacterCard
    } else if signals.has_concepts {
        WorkflowStep::SelectConcept
    } else if signals.has_source {
        WorkflowStep::Analyze
    } else {
        WorkflowStep::Upload
    }
}
