//! Axum HTTP surface for the composite service.
//!
//! This crate is the imperative shell around `composite-runtime`: it turns
//! HTTP requests into engine calls and [`CompositeError`](composite_core::CompositeError)s
//! into HTTP responses.
//!
//! # Request Flow
//!
//! 1. **Correlation id** taken from `X-Correlation-ID` or generated
//! 2. **Extract** path, query and JSON body; build the [`RequestContext`](composite_core::RequestContext)
//!    from the correlation id and the caller's `Authorization` header
//! 3. **Call** the aggregation engine, dispatcher or query layer
//! 4. **Map** the result or error to an HTTP response
//!
//! # Example
//!
//! ```ignore
//! use composite_web::{AppState, build_router};
//!
//! let state = AppState::from_config(Config::from_env()?)?;
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, build_router(state)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{ApiJson, ApiQuery, Context, CorrelationId};
pub use middleware::correlation_id_layer;
pub use router::build_router;
pub use state::{AppState, Transports};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
