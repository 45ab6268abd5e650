//! Client configuration model.
//!
//! This module provides the `ClientConfig` structure that controls how the
//! core talks to the generation backend and which defaults it uses when a
//! consumer does not specify them.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How `approve_scene` treats the local scene before the server confirms.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPolicy {
    /// Flip the local status immediately and keep it even if the server
    /// rejects the approval.
    #[default]
    Optimistic,
    /// Flip immediately, restore the previous scene if the server rejects it.
    OptimisticRollback,
    /// Only flip after the server confirmed the approval.
    Confirmed,
}

/// Client settings from `.screenplay-kit/config.toml`.
///
/// # Example
///
/// ```toml
/// # .screenplay-kit/config.toml
/// base_url = "http://localhost:8000"
/// api_prefix = "/api/v1"
/// request_timeout_secs = 300
/// approval_policy = "optimistic"
/// default_methodology = "save_the_cat"
/// default_language = "tr"
/// default_duration_minutes = 30
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme, host and port of the backend.
    pub base_url: String,

    /// Path prefix of the versioned API. `/health` lives outside it.
    pub api_prefix: String,

    /// Timeout for request/response calls. The scene stream is never timed out
    /// by the client.
    pub request_timeout_secs: u64,

    pub approval_policy: ApprovalPolicy,

    /// Methodology used by beat-sheet creation when none is given.
    pub default_methodology: String,

    pub default_language: String,

    pub default_duration_minutes: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_prefix: "/api/v1".to_string(),
            request_timeout_secs: 300,
            approval_policy: ApprovalPolicy::Optimistic,
            default_methodology: "save_the_cat".to_string(),
            default_language: "tr".to_string(),
            default_duration_minutes: 30,
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at the given backend, everything else default.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Absolute URL of an API path such as `/projects/abc`.
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            normalize_prefix(&self.api_prefix),
            path
        )
    }

    /// Absolute URL of a path outside the API prefix (e.g. `/health`).
    pub fn root_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_joins_cleanly() {
        let config = ClientConfig::with_base_url("http://localhost:8000/");
        assert_eq!(
            config.api_url("/projects/abc"),
            "http://localhost:8000/api/v1/projects/abc"
        );
        assert_eq!(config.root_url("/health"), "http://localhost:8000/health");
    }

    #[test]
    fn test_api_url_with_empty_prefix() {
        let config = ClientConfig {
            api_prefix: "/".to_string(),
            ..ClientConfig::with_base_url("http://example.com")
        };
        assert_eq!(config.api_url("/projects"), "http://example.com/projects");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ClientConfig = toml::from_str(r#"approval_policy = "confirmed""#).unwrap();
        assert_eq!(config.approval_policy, ApprovalPolicy::Confirmed);
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.request_timeout(), Duration::from_secs(300));
    }
}
