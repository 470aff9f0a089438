//! # Composite Runtime
//!
//! The I/O half of the composite service: HTTP clients for the sibling
//! services, the aggregation engine, the asynchronous bridges, the
//! notification dispatcher and the query layer.
//!
//! ## Components
//!
//! - **[`ResourceClient`]**: one sibling service's REST resource, with context
//!   headers forwarded and failures mapped into [`CompositeError`](composite_core::CompositeError)
//! - **[`ServiceLocator`]**: liveness probes (`GET {base}/` must answer 200)
//! - **[`AggregationEngine`]**: composite create, list, get and update
//! - **[`PubSubBridge`] / [`WorkflowBridge`]**: bounded polling rendezvous
//! - **[`NotificationDispatcher`]**: webhook event to email notification
//! - **[`QueryLayer`]**: breeder → pets → waitlist graph
//! - **[`adapters`]**: REST implementations of the transport traits
//!
//! ## Example
//!
//! ```ignore
//! use composite_runtime::{AggregationEngine, Config};
//!
//! let config = Config::from_env()?;
//! let engine = AggregationEngine::new(locator, breeders, pets, links);
//! let composite = engine.create_composite(input, &ctx).await?;
//! ```

pub mod adapters;
pub mod aggregation;
pub mod bridge;
pub mod client;
pub mod config;
pub mod locator;
/// Prometheus metrics for observability
pub mod metrics;
pub mod notify;
pub mod query;

pub use aggregation::{AggregationEngine, Created};
pub use bridge::{PubSubBridge, WorkflowBridge};
pub use client::{ResourceClient, http_client};
pub use config::{BreederLookup, Config, ConfigError};
pub use locator::{ReadinessReport, ServiceLocator, ServiceProbe};
pub use notify::NotificationDispatcher;
pub use query::QueryLayer;
