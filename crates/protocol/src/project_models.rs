//! Project models.
//!
//! A project is the unit of work on the backend: it owns the uploaded source,
//! the generation configuration and the screenplay produced for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generation settings a project was created with.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct ProjectConfig {
    /// Target film duration in minutes.
    #[serde(default = "default_duration_minutes")]
    pub target_duration_minutes: u32,

    /// Screenplay language code (`tr`, `en`).
    #[serde(default = "default_language")]
    pub language: String,

    /// Model id used for scenario writing.
    #[serde(default)]
    pub scenario_model: String,

    /// Context cache time-to-live on the backend.
    #[serde(default)]
    pub cache_ttl_seconds: u64,
}

fn default_duration_minutes() -> u32 {
    30
}

fn default_language() -> String {
    "tr".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            target_duration_minutes: default_duration_minutes(),
            language: default_language(),
            scenario_model: String::new(),
            cache_ttl_seconds: 0,
        }
    }
}

/// Production modules a project moves through. Only `Senaryo` is driven by
/// this crate; the others are reported for progress display.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "snake_case")]
pub enum ModuleType {
    Senaryo,
    Asset,
    Shotlist,
    Storyboard,
}

/// Progress of a single production module.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ModuleProgress {
    pub module: ModuleType,
    #[serde(default)]
    pub is_started: bool,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub progress_percentage: f64,
    #[serde(default)]
    pub current_step: Option<String>,
}

/// Cumulative token usage reported by the backend.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, TS)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub cached_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Full project record as returned by `GET /projects/{id}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct Project {
    /// Backend-assigned project id.
    pub id: String,

    /// Display name.
    pub name: String,

    #[serde(default)]
    pub config: ProjectConfig,

    /// Reference to the uploaded source material, if any.
    ///
    /// Its presence alone moves a fresh project from `upload` to `analyze`
    /// when the project is resumed.
    #[serde(default)]
    pub source_file_uri: Option<String>,

    #[serde(default)]
    pub source_file_name: Option<String>,

    #[serde(default)]
    pub module_progress: Vec<ModuleProgress>,

    #[serde(default)]
    pub total_token_usage: TokenUsage,

    #[serde(default, with = "crate::timestamp::option")]
    #[ts(type = "string | null")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, with = "crate::timestamp::option")]
    #[ts(type = "string | null")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Project {
    /// A freshly created project with default configuration and no source.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            config: ProjectConfig::default(),
            source_file_uri: None,
            source_file_name: None,
            module_progress: Vec::new(),
            total_token_usage: TokenUsage::default(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Whether a source file has been attached to this project.
    pub fn has_source(&self) -> bool {
        self.source_file_uri
            .as_deref()
            .is_some_and(|uri| !uri.is_empty())
    }

    /// Progress of the given module, if the backend reported it.
    pub fn module(&self, module: ModuleType) -> Option<&ModuleProgress> {
        self.module_progress.iter().find(|p| p.module == module)
    }
}

/// Project list entry as returned by `GET /projects`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    #[serde(default, with = "crate::timestamp::option")]
    #[ts(type = "string | null")]
    pub created_at: Option<DateTime<Utc>>,
    /// Screenplay module progress in percent.
    #[serde(default)]
    pub progress: f64,
}
