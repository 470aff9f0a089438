//! Shared harness: one wiremock server standing in for every sibling service.

#![allow(dead_code)]

use composite_core::{Hypermedia, Service};
use composite_runtime::config::ServiceConfig;
use composite_runtime::{AggregationEngine, ResourceClient, ServiceLocator};
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const URL_PREFIX: &str = "http://composite.test/api/v1";

pub struct Upstreams {
    pub server: MockServer,
    pub http: Client,
    pub services: Arc<ServiceConfig>,
}

impl Upstreams {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let services = Arc::new(ServiceConfig {
            breeder_url: format!("{}/breeders", server.uri()),
            pet_url: format!("{}/pets", server.uri()),
            customer_url: format!("{}/customers", server.uri()),
            timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(1),
        });
        Self {
            server,
            http: Client::new(),
            services,
        }
    }

    pub fn client(&self, service: Service) -> ResourceClient {
        ResourceClient::new(self.http.clone(), service, self.services.base_url(service))
    }

    pub fn locator(&self) -> ServiceLocator {
        ServiceLocator::new(self.http.clone(), Arc::clone(&self.services))
    }

    pub fn engine(&self) -> AggregationEngine {
        AggregationEngine::new(
            self.locator(),
            self.client(Service::Breeder),
            self.client(Service::Pet),
            Hypermedia::new(URL_PREFIX),
        )
    }

    /// Answer the liveness probe of `service` with `status`.
    pub async fn probe(&self, service: Service, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/{}s/", service.as_str())))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({"data": [], "links": []})),
            )
            .mount(&self.server)
            .await;
    }

    /// Requests received for `method_name` under `prefix`.
    pub async fn requests(&self, method_name: &str, prefix: &str) -> Vec<wiremock::Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| {
                request.method.as_str() == method_name && request.url.path().starts_with(prefix)
            })
            .collect()
    }
}
