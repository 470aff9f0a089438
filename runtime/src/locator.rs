//! Service Locator: base URLs and liveness probes for sibling services.
//!
//! A service is present when `GET {base_url}/` answers with HTTP 200. The check
//! reads the numeric status code and nothing else; network failures count as
//! "not present" and never raise.

use crate::config::ServiceConfig;
use composite_core::{CompositeError, CompositeResult, Service};
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Result of probing one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceProbe {
    /// Probed service
    pub service: Service,
    /// Whether it answered 200
    pub available: bool,
    /// Status it answered with, if it answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Probe latency
    pub latency_ms: u64,
    /// Transport error, if it did not answer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Readiness report over every sibling service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessReport {
    /// `true` when every service is available
    pub ready: bool,
    /// Per-service probes, in [`Service::ALL`] order
    pub services: Vec<ServiceProbe>,
}

/// Resolves and probes sibling services.
#[derive(Clone, Debug)]
pub struct ServiceLocator {
    http: Client,
    services: Arc<ServiceConfig>,
}

impl ServiceLocator {
    /// Create a locator sharing `http`.
    #[must_use]
    pub const fn new(http: Client, services: Arc<ServiceConfig>) -> Self {
        Self { http, services }
    }

    /// Base URL of `service`.
    #[must_use]
    pub fn base_url(&self, service: Service) -> &str {
        self.services.base_url(service)
    }

    /// `true` if `service` answers its root path with 200.
    pub async fn is_service_available(&self, service: Service) -> bool {
        self.probe(service).await.available
    }

    /// Fail fast when any of `services` is down.
    ///
    /// # Errors
    ///
    /// [`CompositeError::ServiceUnavailable`] naming the first unavailable
    /// service, in the order given.
    pub async fn ensure_available(&self, services: &[Service]) -> CompositeResult<()> {
        let probes = join_all(services.iter().map(|service| self.probe(*service))).await;
        match probes.into_iter().find(|probe| !probe.available) {
            Some(probe) => {
                tracing::warn!(
                    service = probe.service.as_str(),
                    status = probe.status,
                    "Sibling service unavailable"
                );
                Err(CompositeError::ServiceUnavailable {
                    service: probe.service,
                })
            }
            None => Ok(()),
        }
    }

    /// Probe every sibling service concurrently.
    pub async fn probe_all(&self) -> ReadinessReport {
        let services = join_all(Service::ALL.iter().map(|service| self.probe(*service))).await;
        ReadinessReport {
            ready: services.iter().all(|probe| probe.available),
            services,
        }
    }

    async fn probe(&self, service: Service) -> ServiceProbe {
        let url = format!("{}/", self.base_url(service));
        let started = Instant::now();
        let result = self
            .http
            .get(&url)
            .timeout(self.services.probe_timeout)
            .send()
            .await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(response) => {
                let status = response.status();
                ServiceProbe {
                    service,
                    available: status == StatusCode::OK,
                    status: Some(status.as_u16()),
                    latency_ms,
                    error: None,
                }
            }
            Err(e) => {
                tracing::debug!(service = service.as_str(), url = %url, error = %e, "Probe failed");
                ServiceProbe {
                    service,
                    available: false,
                    status: None,
                    latency_ms,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
