//! Workflow stage and context-window models.
//!
//! This module defines the fixed, ordered set of pipeline stages and the
//! token-budget status reported after every scene-writing operation.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// One discrete phase of the screenplay pipeline.
///
/// The variants are declared in pipeline order; [`WorkflowStep::index`]
/// reflects that order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    /// No source material attached yet.
    #[default]
    Upload,
    /// Source attached, waiting for analysis.
    Analyze,
    /// Concepts proposed, waiting for the user to pick one.
    SelectConcept,
    /// Protagonist generated.
    CharacterCard,
    /// Beat sheet generated.
    BeatSheet,
    /// Scene outlines generated.
    SceneOutline,
    /// At least one scene written.
    Writing,
    /// Every outlined scene has been written.
    Optimization,
    /// Optimization report produced.
    Complete,
}

impl WorkflowStep {
    /// Every stage, in pipeline order.
    pub const ALL: [WorkflowStep; 9] = [
        WorkflowStep::Upload,
        WorkflowStep::Analyze,
        WorkflowStep::SelectConcept,
        WorkflowStep::CharacterCard,
        WorkflowStep::BeatSheet,
        WorkflowStep::SceneOutline,
        WorkflowStep::Writing,
        WorkflowStep::Optimization,
        WorkflowStep::Complete,
    ];

    /// Zero-based position of this stage in the pipeline.
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or_default()
    }

    /// Wire name of the stage.
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStep::Upload => "upload",
            WorkflowStep::Analyze => "analyze",
            WorkflowStep::SelectConcept => "select_concept",
            WorkflowStep::CharacterCard => "character_card",
            WorkflowStep::BeatSheet => "beat_sheet",
            WorkflowStep::SceneOutline => "scene_outline",
            WorkflowStep::Writing => "writing",
            WorkflowStep::Optimization => "optimization",
            WorkflowStep::Complete => "complete",
        }
    }

    /// Human-readable title.
    pub fn title(self) -> &'static str {
        match self {
            WorkflowStep::Upload => "Upload source",
            WorkflowStep::Analyze => "Analyze",
            WorkflowStep::SelectConcept => "Select concept",
            WorkflowStep::CharacterCard => "Character",
            WorkflowStep::BeatSheet => "Beat sheet",
            WorkflowStep::SceneOutline => "Scene outline",
            WorkflowStep::Writing => "Writing",
            WorkflowStep::Optimization => "Optimization",
            WorkflowStep::Complete => "Complete",
        }
    }

    /// Whether `self` comes strictly before `other` in the pipeline.
    pub fn is_before(self, other: WorkflowStep) -> bool {
        self.index() < other.index()
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of context-window usage.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum ContextLevel {
    #[default]
    Ok,
    Warning,
    Critical,
}

impl ContextLevel {
    /// Usage at or above this percentage is a warning.
    pub const WARNING_PERCENTAGE: f64 = 80.0;
    /// Usage at or above this percentage is critical.
    pub const CRITICAL_PERCENTAGE: f64 = 95.0;

    /// Classify a usage percentage (0-100).
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= Self::CRITICAL_PERCENTAGE {
            ContextLevel::Critical
        } else if percentage >= Self::WARNING_PERCENTAGE {
            ContextLevel::Warning
        } else {
            ContextLevel::Ok
        }
    }
}

/// Context-window usage of a project's generation session.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
pub struct ContextStatus {
    #[serde(default)]
    pub level: ContextLevel,
    #[serde(default)]
    pub message: String,
    pub current_tokens: u64,
    pub max_tokens: u64,
    #[serde(default)]
    pub percentage: f64,
    #[serde(default)]
    pub remaining: i64,
    #[serde(default)]
    pub cached_tokens: u64,
    #[serde(default)]
    pub cache_ratio: f64,
}

impl ContextStatus {
    /// Build a status from raw token counts.
    pub fn from_tokens(current_tokens: u64, max_tokens: u64) -> Self {
        Self {
            current_tokens,
            max_tokens,
            ..Default::default()
        }
        .recomputed()
    }

    /// Recompute `percentage`, `remaining` and `level` from the token counts.
    ///
    /// The server's own classification is never trusted over the counts.
    pub fn recomputed(mut self) -> Self {
        self.percentage = if self.max_tokens > 0 {
            self.current_tokens as f64 / self.max_tokens as f64 * 100.0
        } else {
            0.0
        };
        self.remaining = self.max_tokens as i64 - self.current_tokens as i64;
        self.level = ContextLevel::from_percentage(self.percentage);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order() {
        assert_eq!(WorkflowStep::Upload.index(), 0);
        assert_eq!(WorkflowStep::Complete.index(), 8);
        assert!(WorkflowStep::BeatSheet.is_before(WorkflowStep::SceneOutline));
        assert!(!WorkflowStep::Writing.is_before(WorkflowStep::Writing));
        for (i, step) in WorkflowStep::ALL.iter().enumerate() {
            assert_eq!(step.index(), i);
        }
    }

    #[test]
    fn test_step_wire_names_match_serde() {
        for step in WorkflowStep::ALL {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(json, format!("\"{}\"", step.as_str()));
        }
    }

    #[test]
    fn test_context_level_thresholds() {
        assert_eq!(ContextLevel::from_percentage(0.0), ContextLevel::Ok);
        assert_eq!(ContextLevel::from_percentage(79.99), ContextLevel::Ok);
        assert_eq!(ContextLevel::from_percentage(80.0), ContextLevel::Warning);
        assert_eq!(ContextLevel::from_percentage(94.9), ContextLevel::Warning);
        assert_eq!(ContextLevel::from_percentage(95.0), ContextLevel::Critical);
        assert_eq!(ContextLevel::from_percentage(120.0), ContextLevel::Critical);
    }

    #[test]
    fn test_context_status_from_tokens() {
        let status = ContextStatus::from_tokens(850_000, 1_000_000);
        assert_eq!(status.level, ContextLevel::Warning);
        assert_eq!(status.remaining, 150_000);
        assert!((status.percentage - 85.0).abs() < 1e-9);

        let empty = ContextStatus::from_tokens(10, 0);
        assert_eq!(empty.percentage, 0.0);
        assert_eq!(empty.level, ContextLevel::Ok);
    }

    #[test]
    fn test_context_status_server_level_is_overridden() {
        let json = r#"{
            "level": "ok",
            "message": "fine",
            "current_tokens": 960,
            "max_tokens": 1000,
            "percentage": 1.0,
            "remaining": 40
        }"#;
        let status: ContextStatus = serde_json::from_str(json).unwrap();
        let status = status.recomputed();
        assert_eq!(status.level, ContextLevel::Critical);
        assert_eq!(status.message, "fine");
    }
}
