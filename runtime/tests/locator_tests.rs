//! Liveness probes against mocked and unreachable services.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

mod common;

use common::Upstreams;
use composite_core::Service;
use composite_runtime::ServiceLocator;
use composite_runtime::config::ServiceConfig;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_pet_service_answering_200_is_available() {
    let upstreams = Upstreams::start().await;
    upstreams.probe(Service::Pet, 200).await;

    assert!(upstreams.locator().is_service_available(Service::Pet).await);
}

#[tokio::test]
async fn test_only_exact_200_counts() {
    let upstreams = Upstreams::start().await;
    upstreams.probe(Service::Breeder, 204).await;

    assert!(!upstreams.locator().is_service_available(Service::Breeder).await);
}

#[tokio::test]
async fn test_unreachable_service_is_unavailable_not_an_error() {
    let services = Arc::new(ServiceConfig {
        breeder_url: "http://127.0.0.1:1/breeders".into(),
        pet_url: "http://127.0.0.1:1/pets".into(),
        customer_url: "http://127.0.0.1:1/customers".into(),
        timeout: Duration::from_secs(1),
        probe_timeout: Duration::from_millis(500),
    });
    let locator = ServiceLocator::new(reqwest::Client::new(), services);

    assert!(!locator.is_service_available(Service::Customer).await);
    let report = locator.probe_all().await;
    assert!(!report.ready);
    assert!(report.services.iter().all(|probe| probe.error.is_some()));
}

#[tokio::test]
async fn test_readiness_reports_each_service() {
    let upstreams = Upstreams::start().await;
    upstreams.probe(Service::Breeder, 200).await;
    upstreams.probe(Service::Pet, 200).await;
    upstreams.probe(Service::Customer, 500).await;

    let report = upstreams.locator().probe_all().await;

    assert!(!report.ready);
    let statuses: Vec<_> = report
        .services
        .iter()
        .map(|entry| (entry.service, entry.status))
        .collect();
    assert_eq!(
        statuses,
        [
            (Service::Breeder, Some(200)),
            (Service::Pet, Some(200)),
            (Service::Customer, Some(500)),
        ]
    );
}
