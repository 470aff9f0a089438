//! Application state for Axum handlers.
//!
//! Everything is built once at startup from [`Config`] and shared by every
//! request. Cloning is cheap: components hold `Arc`s and a shared
//! `reqwest::Client`.

use composite_core::{
    CompositeResult, Hypermedia, MessageChannel, NotificationFunction, Service, WorkflowEngine,
};
use composite_runtime::adapters::{HttpFunction, PubSubRestChannel, WorkflowsRestEngine};
use composite_runtime::{
    AggregationEngine, Config, NotificationDispatcher, PubSubBridge, QueryLayer, ResourceClient,
    ServiceLocator, WorkflowBridge, http_client,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Transport implementations behind the asynchronous bridges and the webhook.
#[derive(Clone)]
pub struct Transports {
    /// Pub/sub channel for the breeder rendezvous
    pub channel: Arc<dyn MessageChannel>,
    /// Workflow engine for customer lookups
    pub workflows: Arc<dyn WorkflowEngine>,
    /// Email notification function
    pub function: Arc<dyn NotificationFunction>,
}

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Read-only configuration
    pub config: Arc<Config>,
    /// Liveness probes
    pub locator: ServiceLocator,
    /// Composite operations
    pub engine: AggregationEngine,
    /// Webhook handling
    pub notifications: NotificationDispatcher,
    /// Breeder graph queries
    pub query: QueryLayer,
    /// Prometheus handle, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build the state with the Google REST transports.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: Config) -> CompositeResult<Self> {
        let http = http_client(config.services.timeout)?;
        let token = config.access_token.clone();
        let transports = Transports {
            channel: Arc::new(PubSubRestChannel::new(http.clone(), &config.pubsub, token.clone())),
            workflows: Arc::new(WorkflowsRestEngine::new(http.clone(), &config.workflow, token)),
            function: Arc::new(HttpFunction::new(
                http.clone(),
                config.notification.function_url.clone(),
            )),
        };
        Ok(Self::with_transports(config, http, transports))
    }

    /// Build the state over explicit transports.
    #[must_use]
    pub fn with_transports(config: Config, http: reqwest::Client, transports: Transports) -> Self {
        let config = Arc::new(config);
        let services = Arc::new(config.services.clone());
        let client = |service: Service| {
            ResourceClient::new(http.clone(), service, services.base_url(service))
        };

        let locator = ServiceLocator::new(http.clone(), Arc::clone(&services));
        let engine = AggregationEngine::new(
            locator.clone(),
            client(Service::Breeder),
            client(Service::Pet),
            Hypermedia::new(config.server.url_prefix.clone()),
        )
        .with_pubsub(
            PubSubBridge::new(transports.channel, &config.pubsub),
            config.breeder_lookup,
        )
        .with_workflow(WorkflowBridge::new(transports.workflows, &config.workflow));
        let notifications = NotificationDispatcher::new(
            client(Service::Breeder),
            client(Service::Pet),
            client(Service::Customer),
            transports.function,
        );
        let query = QueryLayer::new(
            client(Service::Breeder),
            client(Service::Pet),
            client(Service::Customer),
        );

        Self {
            config,
            locator,
            engine,
            notifications,
            query,
            metrics: None,
        }
    }

    /// Serve `handle` at `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState>();
    }
}
