//! Aggregation engine against mocked sibling services.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

mod common;

use common::{URL_PREFIX, Upstreams};
use composite_core::{
    CompositeError, CompositeFilter, CompositeUpdate, RequestContext, Service,
};
use composite_testing::fixtures::{
    breeder_in, breeder_json, composite_in, list_json, pet_in, pet_json,
};
use serde_json::{Value, json};
use uuid::Uuid;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

async fn mount_breeder_create(upstreams: &Upstreams, id: &str) {
    Mock::given(method("POST"))
        .and(path("/breeders/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(breeder_json(id, &breeder_in())))
        .mount(&upstreams.server)
        .await;
}

#[tokio::test]
async fn test_create_posts_every_pet_in_order_with_breeder_id() {
    let upstreams = Upstreams::start().await;
    upstreams.probe(Service::Breeder, 200).await;
    upstreams.probe(Service::Pet, 200).await;
    mount_breeder_create(&upstreams, "42").await;
    Mock::given(method("POST"))
        .and(path("/pets/"))
        .and(body_partial_json(json!({"breeder_id": "42"})))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(pet_json("7", "42", &pet_in("Pet 0"))),
        )
        .expect(3)
        .mount(&upstreams.server)
        .await;

    let created = upstreams
        .engine()
        .create_composite(composite_in(3), &RequestContext::generate())
        .await
        .unwrap();

    let names: Vec<String> = upstreams
        .requests("POST", "/pets/")
        .await
        .iter()
        .map(|request| request.body_json::<Value>().unwrap()["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["Pet 0", "Pet 1", "Pet 2"]);

    assert_eq!(created.location, format!("{URL_PREFIX}/composites/42/"));
    assert!(created.link_header.contains("rel=\"self\""));
    assert_eq!(created.body.breeders.data[0].id, "42");
    assert_eq!(created.body.pets.data.len(), 3);
    assert_eq!(created.body.links[0].href, created.location);
}

#[tokio::test]
async fn test_second_pet_failure_reports_partial_creation() {
    let upstreams = Upstreams::start().await;
    upstreams.probe(Service::Breeder, 200).await;
    upstreams.probe(Service::Pet, 200).await;
    mount_breeder_create(&upstreams, "42").await;
    Mock::given(method("POST"))
        .and(path("/pets/"))
        .and(body_partial_json(json!({"name": "Pet 1"})))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"detail": "bad price"})))
        .with_priority(1)
        .mount(&upstreams.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/pets/"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(pet_json("7", "42", &pet_in("Pet 0"))),
        )
        .mount(&upstreams.server)
        .await;

    let err = upstreams
        .engine()
        .create_composite(composite_in(3), &RequestContext::generate())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 422);
    let details = err.details().unwrap();
    assert_eq!(details["breeder_id"], "42");
    assert_eq!(details["failed_index"], 1);
    assert_eq!(details["created_pets"].as_array().unwrap().len(), 1);
    assert_eq!(upstreams.requests("POST", "/pets/").await.len(), 2);
    assert!(upstreams.requests("DELETE", "/").await.is_empty());
}

#[tokio::test]
async fn test_create_fails_fast_when_pet_service_is_down() {
    let upstreams = Upstreams::start().await;
    upstreams.probe(Service::Breeder, 200).await;
    upstreams.probe(Service::Pet, 503).await;

    let err = upstreams
        .engine()
        .create_composite(composite_in(1), &RequestContext::generate())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 404);
    assert_eq!(err.to_string(), "Pet service not found");
    assert!(upstreams.requests("POST", "/").await.is_empty());
}

#[tokio::test]
async fn test_invalid_composite_sends_nothing() {
    let upstreams = Upstreams::start().await;
    let mut input = composite_in(1);
    input.breeder.name = "  ".into();

    let err = upstreams
        .engine()
        .create_composite(input, &RequestContext::generate())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 400);
    assert!(upstreams.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_forwards_filters_to_each_service() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/breeders/"))
        .and(wiremock::matchers::query_param("breeder_city", "Austin"))
        .and(wiremock::matchers::query_param("limit", "5"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(list_json(vec![breeder_json("1", &breeder_in())])),
        )
        .mount(&upstreams.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pets/"))
        .and(wiremock::matchers::query_param("type", "cat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(vec![])))
        .mount(&upstreams.server)
        .await;

    let filter = CompositeFilter {
        breeder_limit: Some(5),
        breeder_city: Some("Austin".into()),
        pet_type: Some("cat".into()),
        ..CompositeFilter::default()
    };
    let composite = upstreams
        .engine()
        .list_composites(&filter, &RequestContext::generate())
        .await
        .unwrap();

    assert_eq!(composite.breeders.data.len(), 1);
    assert!(composite.pets.data.is_empty());
    assert_eq!(composite.links[0].href, format!("{URL_PREFIX}/composites/"));
}

#[tokio::test]
async fn test_list_failure_is_internal_error() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/breeders/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_json(vec![])))
        .mount(&upstreams.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pets/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&upstreams.server)
        .await;

    let err = upstreams
        .engine()
        .list_composites(&CompositeFilter::default(), &RequestContext::generate())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 500);
    assert!(err.to_string().contains("down"));
}

#[tokio::test]
async fn test_get_forwards_context_headers() {
    let upstreams = Upstreams::start().await;
    let correlation_id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path("/breeders/42/"))
        .and(header("X-Correlation-ID", correlation_id.to_string().as_str()))
        .and(header("Authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(breeder_json("42", &breeder_in())))
        .expect(1)
        .mount(&upstreams.server)
        .await;

    let ctx = RequestContext::new(correlation_id.to_string()).with_authorization("Bearer abc");
    let breeder = upstreams.engine().get_composite("42", &ctx).await.unwrap();

    assert_eq!(breeder.attributes.name, "Happy Paws");
    assert_eq!(breeder.links[0].href, format!("{URL_PREFIX}/composites/42/"));
}

#[tokio::test]
async fn test_get_missing_breeder_is_not_found() {
    let upstreams = Upstreams::start().await;
    Mock::given(method("GET"))
        .and(path("/breeders/404/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&upstreams.server)
        .await;

    let err = upstreams
        .engine()
        .get_composite("404", &RequestContext::generate())
        .await
        .unwrap_err();

    assert!(matches!(err, CompositeError::NotFound { resource: "Breeder", .. }));
    assert_eq!(err.to_string(), "Breeder not found");
}

#[tokio::test]
async fn test_update_sends_only_present_fields() {
    let upstreams = Upstreams::start().await;
    upstreams.probe(Service::Breeder, 200).await;
    upstreams.probe(Service::Pet, 200).await;
    Mock::given(method("GET"))
        .and(path("/breeders/42/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(breeder_json("42", &breeder_in())))
        .mount(&upstreams.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pets/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pet_json("7", "42", &pet_in("Rex"))))
        .mount(&upstreams.server)
        .await;
    let mut renamed = breeder_in();
    renamed.name = "New Name".into();
    Mock::given(method("PUT"))
        .and(path("/breeders/42/"))
        .and(body_json(json!({"name": "New Name"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(breeder_json("42", &renamed)))
        .expect(1)
        .mount(&upstreams.server)
        .await;

    let update: CompositeUpdate =
        serde_json::from_value(json!({"breeder": {"name": "New Name"}, "pet": {}})).unwrap();
    let composite = upstreams
        .engine()
        .update_both("42", "7", &update, &RequestContext::generate())
        .await
        .unwrap();

    assert!(upstreams.requests("PUT", "/pets/").await.is_empty());
    assert_eq!(composite.breeders.data[0].attributes.name, "New Name");
    assert_eq!(composite.pets.data[0].attributes.name, "Rex");
    assert_eq!(
        composite.links[0].href,
        format!("{URL_PREFIX}/composites/both/42/7/")
    );
}

#[tokio::test]
async fn test_update_missing_breeder_is_not_found() {
    let upstreams = Upstreams::start().await;
    upstreams.probe(Service::Breeder, 200).await;
    upstreams.probe(Service::Pet, 200).await;
    Mock::given(method("GET"))
        .and(path("/breeders/42/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&upstreams.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pets/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pet_json("7", "42", &pet_in("Rex"))))
        .mount(&upstreams.server)
        .await;

    let update: CompositeUpdate = serde_json::from_value(json!({"pet": {"price": 10.0}})).unwrap();
    let err = upstreams
        .engine()
        .update_both("42", "7", &update, &RequestContext::generate())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 404);
    assert_eq!(err.to_string(), "Breeder not found");
    assert!(upstreams.requests("PUT", "/").await.is_empty());
}

#[tokio::test]
async fn test_update_failure_passes_upstream_status_through() {
    let upstreams = Upstreams::start().await;
    upstreams.probe(Service::Breeder, 200).await;
    upstreams.probe(Service::Pet, 200).await;
    Mock::given(method("GET"))
        .and(path("/breeders/42/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(breeder_json("42", &breeder_in())))
        .mount(&upstreams.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pets/7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pet_json("7", "42", &pet_in("Rex"))))
        .mount(&upstreams.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/pets/7/"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({"detail": "conflict"})))
        .mount(&upstreams.server)
        .await;

    let update: CompositeUpdate = serde_json::from_value(json!({"pet": {"price": 10.0}})).unwrap();
    let err = upstreams
        .engine()
        .update_both("42", "7", &update, &RequestContext::generate())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 409);
    assert_eq!(err.details().unwrap()["body"]["detail"], "conflict");
}
