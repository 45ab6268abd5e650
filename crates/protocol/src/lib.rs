//! # sk-protocol
//!
//! Core protocol definitions and data models for screenplay-kit.
//!
//! This crate defines all shared data structures used for:
//! - Decoding the generation backend's request/response payloads
//! - The screenplay artifact bundle (concepts, character, beats, outlines, scenes)
//! - Workflow stages and context-window status
//! - Communication between the core and UI-level collaborators
//!
//! ## Modules
//!
//! - [`project_models`]: Projects, their configuration and token usage
//! - [`screenplay_models`]: The screenplay artifact bundle
//! - [`workflow_models`]: Pipeline stages and context status
//! - [`api_models`]: Backend request and response bodies
//! - [`ipc`]: Operations and Events between the core and its consumers
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, ts-rs, uuid and chrono
//! - TypeScript generation: All types derive `TS` for client compatibility
//! - Independent compilation: No dependencies on other screenplay-kit crates

pub mod api_models;
pub mod ipc;
pub mod project_models;
pub mod screenplay_models;
pub mod timestamp;
pub mod workflow_models;

// Re-export all public types for convenience
pub use api_models::*;
pub use ipc::*;
pub use project_models::*;
pub use screenplay_models::*;
pub use workflow_models::*;
