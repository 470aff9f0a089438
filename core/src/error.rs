//! Error taxonomy for the composite service.
//!
//! | Variant | Status |
//! |---------|--------|
//! | [`ServiceUnavailable`](CompositeError::ServiceUnavailable) | 404 (liveness pre-check failed) |
//! | [`NotFound`](CompositeError::NotFound) | 404 |
//! | [`Upstream`](CompositeError::Upstream) | upstream status, verbatim |
//! | [`Validation`](CompositeError::Validation) | 400 |
//! | [`RendezvousTimeout`](CompositeError::RendezvousTimeout) | 504 |
//! | [`WorkflowTimeout`](CompositeError::WorkflowTimeout) | 408 |
//! | [`WorkflowFailed`](CompositeError::WorkflowFailed) | 500 |
//! | [`Transport`](CompositeError::Transport) | 502 |
//! | [`Decode`](CompositeError::Decode), [`Internal`](CompositeError::Internal) | 500 |
//! | [`PartialCreation`](CompositeError::PartialCreation) | status of the failing call |
//!
//! Upstream failures are never swallowed: they surface either with the upstream
//! status or as a labelled 500/502.

use crate::messaging::ChannelError;
use crate::model::Pet;
use crate::service::Service;
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Result alias used throughout the composite service.
pub type CompositeResult<T> = Result<T, CompositeError>;

/// Errors produced while aggregating sibling services.
#[derive(Error, Debug)]
pub enum CompositeError {
    /// Liveness pre-check failed for a sibling service.
    #[error("{service} service not found")]
    ServiceUnavailable {
        /// The unavailable service
        service: Service,
    },

    /// The requested resource does not exist upstream.
    #[error("{resource} not found")]
    NotFound {
        /// Resource kind (`Breeder`, `Pet`, `Customer`)
        resource: &'static str,
        /// Requested identifier
        id: String,
    },

    /// An upstream call returned a non-success status.
    #[error("{service} returned status {status}: {body}")]
    Upstream {
        /// Upstream component
        service: String,
        /// HTTP status returned upstream
        status: u16,
        /// Response body returned upstream
        body: String,
    },

    /// The inbound payload failed shape checks.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No reply carrying the expected correlation id arrived in time.
    #[error("No reply for correlation id {correlation_id} within {waited:?}")]
    RendezvousTimeout {
        /// Correlation id that was waited for
        correlation_id: Uuid,
        /// How long the bridge waited
        waited: Duration,
    },

    /// A workflow execution did not reach a terminal state in time.
    #[error("Workflow execution {execution} did not finish within {waited:?}")]
    WorkflowTimeout {
        /// Execution handle
        execution: String,
        /// How long the bridge polled
        waited: Duration,
    },

    /// A workflow execution finished in the FAILED state.
    #[error("Workflow execution {execution} failed: {detail}")]
    WorkflowFailed {
        /// Execution handle
        execution: String,
        /// Error detail reported by the workflow engine
        detail: String,
    },

    /// The request never produced an HTTP response (connect, timeout, TLS).
    #[error("Request to {service} failed: {message}")]
    Transport {
        /// Upstream component
        service: String,
        /// Underlying error
        message: String,
    },

    /// An upstream response could not be decoded into the expected shape.
    #[error("Invalid response from {context}: {message}")]
    Decode {
        /// What was being decoded
        context: String,
        /// Decoder error
        message: String,
    },

    /// Pet creation failed after the breeder (and possibly some pets) were created.
    #[error("Breeder {breeder_id} created but pet #{failed_index} failed: {source}")]
    PartialCreation {
        /// Breeder that was created
        breeder_id: String,
        /// Pets created before the failure, in submission order
        created_pets: Vec<Pet>,
        /// Index of the pet that failed
        failed_index: usize,
        /// Failure of that pet
        #[source]
        source: Box<CompositeError>,
    },

    /// Catch-all for unexpected failures.
    #[error("{0}")]
    Internal(String),
}

impl CompositeError {
    /// Create a not-found error.
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Create a decode error.
    #[must_use]
    pub fn decode(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ServiceUnavailable { .. } | Self::NotFound { .. } => 404,
            Self::Upstream { status, .. } => {
                if (400..=599).contains(status) {
                    *status
                } else {
                    502
                }
            }
            Self::Validation(_) => 400,
            Self::RendezvousTimeout { .. } => 504,
            Self::WorkflowTimeout { .. } => 408,
            Self::Transport { .. } => 502,
            Self::WorkflowFailed { .. } | Self::Decode { .. } | Self::Internal(_) => 500,
            Self::PartialCreation { source, .. } => source.status_code(),
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ServiceUnavailable { .. } => "UPSTREAM_UNAVAILABLE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::RendezvousTimeout { .. } => "GATEWAY_TIMEOUT",
            Self::WorkflowTimeout { .. } => "TIMEOUT",
            Self::WorkflowFailed { .. } => "WORKFLOW_FAILED",
            Self::Transport { .. } => "BAD_GATEWAY",
            Self::Decode { .. } | Self::Internal(_) => "INTERNAL_SERVER_ERROR",
            Self::PartialCreation { .. } => "PARTIAL_CREATION",
        }
    }

    /// Structured details for the response body, where the variant has any.
    #[must_use]
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Upstream {
                service,
                status,
                body,
            } => {
                let body = serde_json::from_str::<Value>(body)
                    .unwrap_or_else(|_| Value::String(body.clone()));
                Some(json!({ "service": service, "status": status, "body": body }))
            }
            Self::NotFound { resource, id } => Some(json!({ "resource": resource, "id": id })),
            Self::PartialCreation {
                breeder_id,
                created_pets,
                failed_index,
                source,
            } => Some(json!({
                "breeder_id": breeder_id,
                "created_pets": created_pets,
                "failed_index": failed_index,
                "cause": source.to_string(),
            })),
            _ => None,
        }
    }

    /// Attach the upstream component name to a transport failure.
    #[must_use]
    pub fn from_channel(service: &str, error: ChannelError) -> Self {
        match error {
            ChannelError::Transport(message) => Self::Transport {
                service: service.to_string(),
                message,
            },
            ChannelError::Status { status, body } => Self::Upstream {
                service: service.to_string(),
                status,
                body,
            },
            ChannelError::Decode(message) => Self::decode(service, message),
        }
    }
}
