//! Screenplay artifact models.
//!
//! These are the outputs of the generation pipeline, in the order they are
//! produced: concepts, protagonist, beat sheet, scene outlines and scenes.
//! `scene_number` is the join key between outlines and scenes.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A candidate film premise proposed by the analysis stage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct FilmConcept {
    pub genre: String,
    pub logline: String,
    pub tone: String,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub unique_selling_point: Option<String>,
}

/// Character card of the protagonist.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct CharacterCard {
    pub name: String,
    pub dramatic_need: String,
    pub point_of_view: String,
    pub attitude: String,
    pub arc: String,
    #[serde(default)]
    pub backstory: Option<String>,
    #[serde(default)]
    pub flaws: Option<Vec<String>>,
}

/// One beat of the story skeleton.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct Beat {
    /// Ordinal position in the story (1-based).
    pub number: u32,
    pub name: String,
    pub description: String,
    pub estimated_duration_seconds: u32,
    #[serde(default)]
    pub key_moment: Option<String>,
}

/// Ordered beat sheet. Beat order is story order and is never re-sorted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct BeatSheet {
    pub beats: Vec<Beat>,
    pub total_duration_minutes: u32,
    #[serde(default = "default_act_one_end")]
    pub act_one_end: u32,
    #[serde(default = "default_midpoint")]
    pub midpoint: u32,
    #[serde(default = "default_act_two_end")]
    pub act_two_end: u32,
}

fn default_act_one_end() -> u32 {
    3
}

fn default_midpoint() -> u32 {
    8
}

fn default_act_two_end() -> u32 {
    12
}

impl BeatSheet {
    /// Sum of the beats' estimated durations.
    pub fn estimated_duration_seconds(&self) -> u32 {
        self.beats.iter().map(|b| b.estimated_duration_seconds).sum()
    }
}

/// A planned, not-yet-written scene.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct SceneOutline {
    /// 1-based, unique and contiguous across the outline sequence.
    pub scene_number: u32,
    pub location: String,
    pub time_of_day: String,
    /// Target duration.
    pub duration_seconds: u32,
    pub brief_description: String,
    #[serde(default)]
    pub beat_reference: Option<u32>,
    #[serde(default)]
    pub emotional_arc: Option<String>,
}

/// A single line of dialogue.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct DialogueLine {
    pub character: String,
    pub line: String,
    #[serde(default)]
    pub parenthetical: Option<String>,
}

/// Review status of a written scene.
///
/// `Draft -> Approved` via approve, `Draft | Approved -> Revised` via revise.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum SceneStatus {
    #[default]
    Draft,
    Approved,
    Revised,
}

/// A written scene.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct Scene {
    /// Must match the `scene_number` of an existing outline.
    pub scene_number: u32,
    pub header: String,
    pub action: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dialogue: Vec<DialogueLine>,
    pub duration_seconds: u32,
    #[serde(default)]
    pub status: SceneStatus,
    #[serde(default)]
    pub revision_count: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<DialogueLine>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<DialogueLine>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Backend-side status of the screenplay as a whole.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum ScreenplayStatus {
    #[default]
    Draft,
    Analyzing,
    ConceptSelection,
    BeatSheet,
    SceneOutline,
    Writing,
    Optimization,
    Completed,
}

/// The full artifact bundle of a project, as persisted by the backend.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct Screenplay {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source_summary: Option<String>,
    #[serde(default)]
    pub concepts: Vec<FilmConcept>,
    #[serde(default)]
    pub selected_concept_index: Option<usize>,
    #[serde(default)]
    pub protagonist: Option<CharacterCard>,
    #[serde(default)]
    pub beat_sheet: Option<BeatSheet>,
    #[serde(default)]
    pub scene_outlines: Vec<SceneOutline>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub total_duration_minutes: Option<u32>,
    #[serde(default)]
    pub status: ScreenplayStatus,
    #[serde(default)]
    pub optimization_report: Option<String>,
}

/// Script-doctor report produced by the optimization stage.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
pub struct OptimizationReport {
    #[serde(default)]
    pub continuity_issues: Vec<String>,
    #[serde(default)]
    pub plot_holes: Vec<String>,
    #[serde(default)]
    pub motivation_issues: Vec<String>,
    #[serde(default)]
    pub cliche_warnings: Vec<String>,
    #[serde(default)]
    pub passive_protagonist_issues: Vec<String>,
    #[serde(default)]
    pub first_ten_minutes_check: String,
    #[serde(default)]
    pub robotic_dialogue_issues: Vec<String>,
    /// 1 to 10.
    #[serde(default)]
    pub overall_score: u8,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl OptimizationReport {
    /// Total number of issues across every category.
    pub fn issue_count(&self) -> usize {
        self.continuity_issues.len()
            + self.plot_holes.len()
            + self.motivation_issues.len()
            + self.cliche_warnings.len()
            + self.passive_protagonist_issues.len()
            + self.robotic_dialogue_issues.len()
    }
}
