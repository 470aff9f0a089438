//! Prometheus metrics for the composite service.
//!
//! - Upstream HTTP calls per service and outcome
//! - Pub/sub rendezvous outcomes
//! - Workflow execution outcomes
//! - Notification deliveries
//!
//! # Example
//!
//! ```rust,no_run
//! use composite_runtime::metrics::install_recorder;
//!
//! let handle = install_recorder()?;
//! // Serve `handle.render()` at `/metrics`
//! # Ok::<(), composite_runtime::metrics::MetricsError>(())
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Describe every metric and install the global Prometheus recorder.
///
/// # Errors
///
/// Returns [`MetricsError::Install`] if a recorder is already installed
/// (e.g. a second call in the same process).
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    register_metrics();

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
            ],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?;

    let handle = builder
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

fn register_metrics() {
    describe_counter!(
        "composite_upstream_requests_total",
        "Outbound calls to sibling services, by service and outcome"
    );
    describe_histogram!(
        "composite_upstream_duration_seconds",
        "Latency of outbound calls to sibling services"
    );
    describe_counter!(
        "composite_rendezvous_total",
        "Pub/sub correlation-id rendezvous, by outcome"
    );
    describe_counter!(
        "composite_workflow_executions_total",
        "Workflow executions, by outcome"
    );
    describe_counter!(
        "composite_notifications_total",
        "Notification function invocations, by outcome"
    );
}

/// Upstream call metrics recorder.
pub struct UpstreamMetrics;

impl UpstreamMetrics {
    /// Record one outbound call.
    pub fn record(service: &str, outcome: &'static str, duration: Duration) {
        counter!(
            "composite_upstream_requests_total",
            "service" => service.to_string(),
            "outcome" => outcome
        )
        .increment(1);
        histogram!(
            "composite_upstream_duration_seconds",
            "service" => service.to_string()
        )
        .record(duration.as_secs_f64());
    }
}

/// Rendezvous metrics recorder.
pub struct RendezvousMetrics;

impl RendezvousMetrics {
    /// Record a finished rendezvous (`matched`, `timeout`, `error`).
    pub fn record(outcome: &'static str) {
        counter!("composite_rendezvous_total", "outcome" => outcome).increment(1);
    }
}

/// Workflow metrics recorder.
pub struct WorkflowMetrics;

impl WorkflowMetrics {
    /// Record a finished execution (`succeeded`, `failed`, `timeout`, `error`).
    pub fn record(outcome: &'static str) {
        counter!("composite_workflow_executions_total", "outcome" => outcome).increment(1);
    }
}

/// Notification metrics recorder.
pub struct NotificationMetrics;

impl NotificationMetrics {
    /// Record a delivery attempt (`success`, `partial_success`).
    pub fn record(outcome: &'static str) {
        counter!("composite_notifications_total", "outcome" => outcome).increment(1);
    }
}
