//! Configuration loading and management.
//!
//! This module loads the client configuration from the
//! `.screenplay-kit/config.toml` file and the environment.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::load_config;
pub use models::{ApprovalPolicy, ClientConfig};
