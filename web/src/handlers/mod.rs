//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by domain.

pub mod composites;
pub mod health;
pub mod lookup;
pub mod query;
pub mod webhook;

// Re-export common handler utilities
pub use health::health_check;
