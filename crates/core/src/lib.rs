//! # sk-core
//!
//! Client-side workflow core for screenplay-kit.
//!
//! This crate provides:
//! - Configuration loading from the `.screenplay-kit/` directory
//! - A transport adapter for the generation backend (HTTP and scripted mock)
//! - The workflow manager that drives a project through the pipeline
//! - Incremental scene streaming with cancellation
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and management
//! - [`transport`]: `Backend` trait, HTTP implementation and event-stream decoding
//! - [`workflow`]: Workflow state, stage derivation and the manager
//! - [`streaming`]: Scene accumulator and stream subscriptions
//! - [`reconcile`]: Structural updates of the scene collection

pub mod config;
pub mod reconcile;
pub mod streaming;
pub mod transport;
pub mod workflow;
