//! # Composite Testing
//!
//! Testing utilities for the composite service.
//!
//! This crate provides:
//! - In-memory implementations of the transport traits
//!   ([`InMemoryMessageChannel`], [`ScriptedWorkflowEngine`], [`RecordingFunction`])
//! - Payload fixtures for breeders, pets and composites, plus an environment
//!   map pointing every sibling service at one mock server
//!
//! ## Example
//!
//! ```ignore
//! use composite_testing::{InMemoryMessageChannel, fixtures};
//! use serde_json::json;
//!
//! let channel = InMemoryMessageChannel::replying("responses", |request| {
//!     json!({"data": fixtures::breeder_json("42", &fixtures::breeder_in())})
//! });
//! ```

pub mod fixtures;
pub mod mocks;

pub use mocks::{InMemoryMessageChannel, RecordingFunction, ScriptedWorkflowEngine};
