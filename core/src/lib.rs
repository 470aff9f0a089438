//! # Composite Core
//!
//! Data model, error taxonomy and transport traits for the composite service.
//!
//! The composite service sits in front of independently-owned breeder, pet and
//! customer services. One inbound request fans out into several outbound calls
//! whose results are merged into a single hypermedia response. This crate holds
//! everything that can be described without performing I/O:
//!
//! - **Resources**: [`model`] types exchanged with the sibling services and
//!   returned to clients ([`Breeder`], [`Pet`], [`Composite`], ...)
//! - **Hypermedia**: [`link`] builders for `self`/`collection` affordances
//! - **Request context**: correlation id plus an optional `Authorization` value,
//!   forwarded on every outbound call
//! - **Errors**: the [`CompositeError`] taxonomy and its HTTP status mapping
//! - **Transports**: dyn-compatible traits for the pub/sub channel, the workflow
//!   engine and the notification function
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────────┐
//!  request ─▶│  web (axum)  │── RequestContext ──┐
//!            └──────────────┘                    ▼
//!                                   ┌────────────────────────┐
//!                                   │  runtime               │
//!                                   │  aggregation / bridge  │
//!                                   │  notify / query        │
//!                                   └──────┬──────────┬──────┘
//!                     ResourceClient (HTTP)│          │ MessageChannel / WorkflowEngine
//!                                          ▼          ▼ NotificationFunction
//!                          breeder · pet · customer   pub/sub · workflows · email fn
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod context;
pub mod error;
pub mod filter;
pub mod graph;
pub mod link;
pub mod messaging;
pub mod model;
pub mod notification;
pub mod service;
pub mod workflow;

// Re-export commonly used types
pub use context::{
    AUTHORIZATION_HEADER, CORRELATION_ID_HEADER, MAX_CORRELATION_ID_LEN, RequestContext,
    accept_correlation_id,
};
pub use error::{CompositeError, CompositeResult};
pub use filter::{CompositeFilter, MAX_PAGE_SIZE, QueryParams};
pub use graph::{BreederGraph, Consumer, PetGraph, WaitlistEntry};
pub use link::{Hypermedia, Link};
pub use messaging::{ChannelError, CorrelatedMessage, MessageChannel, ReceivedMessage};
pub use model::{
    Breeder, BreederIn, BreederUpdate, Composite, CompositeIn, CompositeUpdate, Customer,
    ListResponse, NewPet, Pet, PetIn, PetUpdate,
};
pub use notification::{
    DeliveryStatus, FunctionResponse, NotificationEnvelope, NotificationFunction,
    NotificationPayload, WebhookEvent, WebhookOutcome, WebhookPayload,
};
pub use service::Service;
pub use workflow::{ExecutionState, ResultEnvelope, WorkflowEngine, WorkflowExecution};
