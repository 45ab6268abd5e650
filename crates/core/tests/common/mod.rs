//! Common test utilities shared by the integration tests.
//!
//! This module provides:
//! - Fixtures (projects, screenplays, scenes) and a manager harness
//! - Event assertions
//! - A minimal HTTP server for exercising the real transport

pub mod assertions;
pub mod fixtures;
pub mod http_server;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
